//! Command-line commands over the cache.

use anyhow::{bail, Result};
use matchday_core::cache::describe_age;
use matchday_core::{ApiClient, CacheContext, Config, PreloadOrchestrator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Populate the start-up resource set (the default)
    Preload { force: bool },
    Inspect,
    Invalidate(Vec<String>),
    Clear,
    Help,
}

pub const USAGE: &str = "\
Usage: matchday [OPTIONS] [COMMAND]

Commands:
  (none)                    Preload start-up resources into the cache
  --inspect                 Show age and freshness of start-up resources
  --invalidate <PATTERN>... Remove keys; a trailing * removes a whole prefix
  --clear                   Remove every cache entry

Options:
  --force                   Preload even resources that are still fresh
  --offline                 Treat the network as unreachable
  -h, --help                Show this help";

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut command = None;
        let mut force = false;
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            let next = match arg.as_str() {
                "--force" => {
                    force = true;
                    continue;
                }
                "--offline" => continue,
                "-h" | "--help" => Command::Help,
                "--inspect" => Command::Inspect,
                "--clear" => Command::Clear,
                "--invalidate" => {
                    let mut patterns = Vec::new();
                    while let Some(p) = iter.next_if(|a| !a.starts_with("--")) {
                        patterns.push(p.clone());
                    }
                    if patterns.is_empty() {
                        bail!("--invalidate needs at least one key or pattern");
                    }
                    Command::Invalidate(patterns)
                }
                other => bail!("Unknown argument: {}\n\n{}", other, USAGE),
            };
            if command.replace(next).is_some() {
                bail!("Only one command may be given\n\n{}", USAGE);
            }
        }

        Ok(command.unwrap_or(Command::Preload { force }))
    }
}

pub async fn preload(ctx: &CacheContext, config: &Config, force: bool) -> Result<()> {
    let mut api = ApiClient::new(config.api_base_url())?;
    if let Some(ref key) = config.api_key {
        api = api.with_api_key(key.clone());
    }

    let preload = config
        .startup_resources()
        .into_iter()
        .fold(PreloadOrchestrator::new(ctx.clone()), |p, resource| {
            p.task(resource.cache_key(), api.fetcher(resource))
        });

    let report = preload.run(force).await;
    for key in &report.loaded {
        println!("loaded   {}", key);
    }
    for key in &report.skipped {
        println!("fresh    {}", key);
    }
    for failure in &report.failures {
        println!("FAILED   {}: {}", failure.key, failure.error);
    }

    if report.usable_offline {
        println!("\nCached data is available for offline use.");
    } else {
        println!("\nNo usable cached data - the app needs a network connection to start.");
    }
    if !report.is_success() {
        bail!("{} resource(s) failed to preload", report.failures.len());
    }
    Ok(())
}

pub async fn inspect(ctx: &CacheContext, config: &Config) -> Result<()> {
    let cache = ctx.cache();
    let keys: Vec<String> = config
        .startup_resources()
        .iter()
        .map(|r| r.cache_key().into())
        .collect();

    for key in &keys {
        match cache.inspect(key).await {
            Some(info) => println!(
                "{:<36} {:>10}  {:<5}  ttl {}m",
                key,
                info.age_display(),
                if info.is_stale { "stale" } else { "fresh" },
                info.ttl.as_secs() / 60
            ),
            None => println!("{:<36} {:>10}", key, "never"),
        }
    }

    match cache.oldest_age(&keys).await {
        Some(age) => println!("\nOldest cached data: {}", describe_age(age)),
        None => println!("\nNothing cached yet"),
    }
    Ok(())
}

pub async fn invalidate(ctx: &CacheContext, patterns: &[String]) -> Result<()> {
    let removed = ctx.cache().invalidate_many(patterns).await;
    println!("Removed {} cache entries", removed);
    Ok(())
}

pub async fn clear(ctx: &CacheContext) -> Result<()> {
    let removed = ctx.cache().clear_all().await;
    println!("Cleared {} cache entries", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_is_preload() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Preload { force: false });
        assert_eq!(
            Command::parse(&args(&["--offline", "--force"])).unwrap(),
            Command::Preload { force: true }
        );
    }

    #[test]
    fn test_invalidate_collects_patterns() {
        assert_eq!(
            Command::parse(&args(&["--invalidate", "matches:team:1:*", "teams:all", "--offline"]))
                .unwrap(),
            Command::Invalidate(vec!["matches:team:1:*".into(), "teams:all".into()])
        );
        assert!(Command::parse(&args(&["--invalidate"])).is_err());
    }

    #[test]
    fn test_rejects_unknown_and_duplicate_commands() {
        assert!(Command::parse(&args(&["--bogus"])).is_err());
        assert!(Command::parse(&args(&["--clear", "--inspect"])).is_err());
        assert_eq!(Command::parse(&args(&["--inspect"])).unwrap(), Command::Inspect);
    }
}
