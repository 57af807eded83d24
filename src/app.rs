use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::api::{ApiError, HttpApi, HttpOptions};
use crate::auth::{CredentialProvider, TokenFile};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::filter::{SearchField, SearchSpec};
use crate::notify::ConsoleNotifier;
use crate::output::{self, OutputFormat};
use crate::screens::{self, ListScreen};
use crate::view::{ListViewModel, LoadEvent, Mutation, PageChange};

const SESSION_EXPIRED: &str =
    "session expired or not logged in; store a fresh token with --save-token <TOKEN>";

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(about) = cmd.get_about() {
        out.push_str(&format!("{about}\n"));
    }
    if let Some(long_about) = cmd.get_long_about() {
        out.push_str(&format!("\n{long_about}\n"));
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n\n", cmd.get_name()));

    let mut sections: Vec<(&str, Vec<&clap::Arg>)> = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options");
        match sections.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, args)) => args.push(arg),
            None => sections.push((heading, vec![arg])),
        }
    }

    for (heading, args) in sections {
        out.push_str(&format!("{heading}:\n"));
        for arg in args {
            out.push_str(&format!("  {}\n", arg_flags(arg)));
            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str(&format!("          {}\n", help.trim()));
                }
            }
            out.push('\n');
        }
    }
    out
}

fn arg_flags(arg: &clap::Arg) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(short) = arg.get_short() {
        parts.push(format!("-{short}"));
    }
    if let Some(long) = arg.get_long() {
        parts.push(format!("--{long}"));
    }
    for alias in arg.get_visible_aliases().unwrap_or_default() {
        let rendered = format!("--{alias}");
        if !parts.contains(&rendered) {
            parts.push(rendered);
        }
    }
    let mut flags = parts.join(", ");
    if arg.get_action().takes_values() {
        let value_name = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|name| name.as_str())
            .unwrap_or("VALUE");
        flags.push_str(&format!(" <{value_name}>"));
    }
    flags
}

fn render_screen_list(screens: &[ListScreen]) -> String {
    let width = screens.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for screen in screens {
        let paging = if screen.collection.server_paginated {
            "server paging"
        } else {
            "client paging"
        };
        out.push_str(&format!(
            "{}  {} {}\n",
            format!("{:<width$}", screen.name).bold(),
            screen.title,
            format!("(/{}, {paging})", screen.collection.endpoint).dimmed()
        ));
    }
    out
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leasedesk={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Debug)]
pub(crate) struct RunConfig {
    pub(crate) base_url: Option<String>,
    pub(crate) token_path: Option<PathBuf>,
    pub(crate) save_token: Option<String>,
    pub(crate) list_screens: bool,
    pub(crate) screens: Vec<ListScreen>,
    pub(crate) screen: Option<ListScreen>,
    pub(crate) page: usize,
    pub(crate) page_size: Option<usize>,
    pub(crate) search: SearchSpec,
    pub(crate) mutation: Option<Mutation>,
    pub(crate) http: HttpOptions,
    pub(crate) rate: u32,
    pub(crate) output: Option<PathBuf>,
    pub(crate) output_format: OutputFormat,
    pub(crate) no_color: bool,
    pub(crate) verbose: u8,
}

fn mutation_from_args(args: &CliArgs) -> Result<Option<Mutation>, String> {
    if let Some(raw) = args.create.as_deref() {
        let body = validation::parse_json_object(raw)
            .map_err(|e| format!("invalid --create '{raw}': {e}"))?;
        return Ok(Some(Mutation::Create(body)));
    }
    if let Some(id) = args.update.as_deref() {
        let raw = args.data.as_deref().unwrap_or_default();
        let body =
            validation::parse_json_object(raw).map_err(|e| format!("invalid --data '{raw}': {e}"))?;
        return Ok(Some(Mutation::Update {
            id: id.trim().to_string(),
            body,
        }));
    }
    if let Some(id) = args.delete.as_deref() {
        return Ok(Some(Mutation::Delete {
            id: id.trim().to_string(),
        }));
    }
    Ok(None)
}

pub(crate) fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    let rate = args.rate.or(cfg.rate).unwrap_or(0);
    let proxy = args
        .proxy
        .clone()
        .or(cfg.proxy.clone())
        .filter(|p| !p.trim().is_empty());
    let http = HttpOptions {
        timeout_seconds: timeout,
        proxy,
        follow_redirects: cfg.follow_redirects.unwrap_or(true),
        retry_transient: !args.no_retry && cfg.retry.unwrap_or(true),
    };

    let base_url = args
        .base_url
        .clone()
        .or(cfg.base_url.clone())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let token_path = match args.token_file.as_deref().or(cfg.token_file.as_deref()) {
        Some(path) => Some(config::expand_tilde(path)),
        None => config::default_token_path(),
    };

    let page_size = args.page_size.or(cfg.page_size);
    if page_size == Some(0) {
        return Err("invalid page_size, expected positive integer".to_string());
    }

    let output = args.output.as_deref().map(config::expand_tilde);
    let output_format = match args.output_format.as_deref().or(cfg.output_format.as_deref()) {
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => args
            .output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    let screens = screens::merge_screens(screens::builtin_screens(), cfg.screens.unwrap_or_default());
    let standalone = args.list_screens || args.save_token.is_some();
    let screen = match args.screen.as_deref() {
        Some(name) => Some(
            screens::find_screen(&screens, name)
                .cloned()
                .ok_or_else(|| format!("unknown screen '{name}', see --list-screens"))?,
        ),
        None if standalone => None,
        None => return Err("a list screen is required (--screen), see --list-screens".to_string()),
    };

    let search = SearchSpec::new(
        SearchField::parse(args.field.as_deref().unwrap_or_default()),
        args.search.clone().unwrap_or_default(),
    );
    if let Some(screen) = screen.as_ref() {
        screen.check_search_field(&search.field)?;
    }

    if screen.is_some() && !standalone && base_url.is_none() {
        return Err("base URL is required (--url or base_url in config)".to_string());
    }

    Ok(RunConfig {
        base_url,
        token_path,
        save_token: args.save_token.clone(),
        list_screens: args.list_screens,
        screens,
        screen,
        page: args.page.unwrap_or(1),
        page_size,
        search,
        mutation: mutation_from_args(&args)?,
        http,
        rate,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn spinner(message: String) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn check_event(event: LoadEvent) -> Result<(), String> {
    match event {
        LoadEvent::Ready { .. } | LoadEvent::Stale => Ok(()),
        LoadEvent::Failed { message } => Err(message),
        LoadEvent::SessionExpired => Err(SESSION_EXPIRED.to_string()),
    }
}

async fn load_list(vm: &mut ListViewModel, api: &HttpApi) -> Result<(), String> {
    let pb = spinner(format!("Loading {}", vm.screen().title.to_lowercase()))?;
    let event = vm.load(api).await;
    pb.finish_and_clear();
    check_event(event)
}

pub(crate) async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    if let Some(token) = run.save_token.as_deref() {
        let path = run
            .token_path
            .clone()
            .ok_or_else(|| "cannot locate home directory, pass --token-file".to_string())?;
        let store = TokenFile::new(path);
        store
            .store(token)
            .map_err(|e| format!("failed to save token: {e}"))?;
        println!(":: Token saved to {}", store.path().display());
        return Ok(());
    }

    if run.list_screens {
        print!("{}", render_screen_list(&run.screens));
        return Ok(());
    }

    let screen = run
        .screen
        .clone()
        .ok_or_else(|| "a list screen is required (--screen)".to_string())?;
    let base_url = run
        .base_url
        .as_deref()
        .ok_or_else(|| "base URL is required (--url or base_url in config)".to_string())?;
    let credentials: Arc<dyn CredentialProvider> = match run.token_path.clone() {
        Some(path) => Arc::new(TokenFile::new(path)),
        None => Arc::new(crate::auth::StaticToken::anonymous()),
    };
    let api = HttpApi::new(base_url, credentials, &run.http)
        .map_err(|e| format!("failed to set up API client: {e}"))?;

    let mut vm = ListViewModel::new(screen).with_rate_limit(run.rate);
    if let Some(size) = run.page_size {
        vm.set_page_size(size);
    }
    vm.set_page(run.page);
    let loaded_page = vm.page();

    match run.mutation.clone() {
        Some(mutation) => match vm.mutate(&api, mutation, &ConsoleNotifier).await {
            Ok(event) => check_event(event)?,
            Err(ApiError::Auth) => return Err(SESSION_EXPIRED.to_string()),
            Err(e) => return Err(format!("{}: {e}", vm.screen().title)),
        },
        None => load_list(&mut vm, &api).await?,
    }

    vm.set_search(run.search.clone());
    if vm.set_page(run.page) == PageChange::NeedsLoad && vm.page() != loaded_page {
        load_list(&mut vm, &api).await?;
    }

    let report = output::build_report(&vm);
    let bytes = match run.output_format {
        OutputFormat::Text => output::render_text(&report).into_bytes(),
        OutputFormat::Json => output::render_json(&report),
    };
    match run.output.as_ref() {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .map_err(|e| format!("failed to write output file '{}': {e}", path.display()))?;
            tracing::info!(path = %path.display(), "list written");
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                print!("{}", CliArgs::command().render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };
    init_logging(args.verbose);

    let config_path = match args.config.as_deref() {
        Some(path) => Some(config::expand_tilde(path)),
        None => config::default_config_path(),
    };
    if args.init_config {
        let path = config_path.ok_or_else(|| "cannot locate home directory".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!(":: Config at {}", path.display());
        return Ok(());
    }
    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, args.config.is_none())?,
        None => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    tracing::debug!(verbose = run.verbose, screen = ?run.screen.as_ref().map(|s| &s.name), "starting");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
