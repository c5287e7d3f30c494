//! Translates validation rules read from stdin, one per line.
//!
//! Context bindings are given as arguments: `filter_check IsSOTrx=true AD_Org_ID=11`.
use tracing_subscriber::EnvFilter;
use valrule_filter::{ContextBindings, ContextValue, try_translate};

fn parse_binding(arg: &str) -> Option<(&str, ContextValue)> {
    let (name, value) = arg.split_once('=')?;
    let value = match value {
        "true" | "Y" => ContextValue::Bool(true),
        "false" | "N" => ContextValue::Bool(false),
        _ => match value.parse::<f64>() {
            Ok(n) => ContextValue::Number(n),
            Err(_) => ContextValue::Str(value.to_string()),
        },
    };
    Some((name, value))
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut ctx = ContextBindings::new();
    for arg in &args {
        match parse_binding(arg) {
            Some((name, value)) => ctx.insert(name, value),
            None => tracing::warn!(arg, "ignoring argument, expected Name=value"),
        }
    }

    for line in std::io::stdin().lines() {
        let line = line?;
        let now = std::time::Instant::now();
        let res = try_translate(&line, &ctx);
        print!("[in {}μs] ", now.elapsed().as_micros());
        match res {
            Ok(filter) => println!("{filter}"),
            Err(reason) => println!("Not translated: {reason}"),
        }
    }
    Ok(())
}
