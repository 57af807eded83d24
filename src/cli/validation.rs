use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, expected positive integer".to_string());
        }
    }
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err("invalid page-size, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }

    let mutations = [
        args.create.is_some(),
        args.update.is_some(),
        args.delete.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if mutations > 1 {
        return Err("use only one of --create, --update or --delete".to_string());
    }
    if args.update.is_some() && args.data.is_none() {
        return Err("--update requires --data".to_string());
    }
    if args.data.is_some() && args.update.is_none() {
        return Err("--data is only used with --update".to_string());
    }
    for (flag, raw) in [("--create", &args.create), ("--data", &args.data)] {
        if let Some(raw) = raw.as_deref() {
            parse_json_object(raw).map_err(|e| format!("invalid {flag} '{raw}': {e}"))?;
        }
    }
    for (flag, id) in [("--update", &args.update), ("--delete", &args.delete)] {
        if let Some(id) = id.as_deref() {
            if id.trim().is_empty() || id.contains('/') {
                return Err(format!("invalid {flag} id '{id}'"));
            }
        }
    }
    Ok(())
}

pub fn parse_json_object(raw: &str) -> Result<serde_json::Value, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    Ok(value)
}
