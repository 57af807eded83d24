use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "leasedesk",
    version,
    about = "list pages of the warehouse-leasing console, from the terminal",
    long_about = "Leasedesk loads a list screen (warehouses, lots, rentals, ...) from the leasing backend, resolves related records, filters and paginates it.\n\nExamples:\n  leasedesk -u https://api.example.com --screen lots\n  leasedesk --screen rentals --page 2 --search acme --field customer_id\n  leasedesk --screen lots --delete 42\n  leasedesk --save-token <TOKEN>\n\nTip: Use --config to persist the base URL and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'u',
        long = "url",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "Backend",
        help = "Base URL of the leasing API."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Backend",
        help = "Path to config file (defaults to ~/.leasedesk/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Backend",
        help = "Write a commented default config file (if none exists) and exit."
    )]
    pub init_config: bool,

    #[arg(
        long = "tf",
        visible_alias = "token-file",
        value_name = "FILE",
        help_heading = "Backend",
        help = "Bearer token file (defaults to ~/.leasedesk/token)."
    )]
    pub token_file: Option<String>,

    #[arg(
        long = "st",
        visible_alias = "save-token",
        value_name = "TOKEN",
        help_heading = "Backend",
        help = "Store a bearer token in the token file and exit."
    )]
    pub save_token: Option<String>,

    #[arg(
        short = 's',
        long = "scr",
        visible_alias = "screen",
        value_name = "NAME",
        help_heading = "List",
        help = "List screen to show (see --list-screens)."
    )]
    pub screen: Option<String>,

    #[arg(
        long = "ls",
        visible_alias = "list-screens",
        help_heading = "List",
        help = "Print the known list screens and exit."
    )]
    pub list_screens: bool,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "List",
        help = "Page to show (1-based)."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 'n',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "List",
        help = "Rows per page."
    )]
    pub page_size: Option<usize>,

    #[arg(
        short = 'q',
        long = "sr",
        visible_alias = "search",
        value_name = "TERM",
        help_heading = "List",
        help = "Case-insensitive search term."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'f',
        long = "fld",
        visible_alias = "field",
        value_name = "FIELD",
        help_heading = "List",
        help = "Field to search in ('all' searches every field)."
    )]
    pub field: Option<String>,

    #[arg(
        long = "create",
        value_name = "JSON",
        help_heading = "Records",
        help = "Create a record from a JSON object, then show the list."
    )]
    pub create: Option<String>,

    #[arg(
        long = "update",
        value_name = "ID",
        help_heading = "Records",
        help = "Update the record with this id (requires --data)."
    )]
    pub update: Option<String>,

    #[arg(
        long = "data",
        value_name = "JSON",
        help_heading = "Records",
        help = "JSON object sent with --update."
    )]
    pub data: Option<String>,

    #[arg(
        long = "delete",
        value_name = "ID",
        help_heading = "Records",
        help = "Delete the record with this id, then show the list."
    )]
    pub delete: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "HTTP",
        help = "Related-record lookups per second (0 = unlimited)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "nr",
        visible_alias = "no-retry",
        help_heading = "HTTP",
        help = "Do not retry a request once when the backend is unreachable."
    )]
    pub no_retry: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the list to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,
}
