//! `check` command: validates configuration and nvidia-smi availability.

use anyhow::{bail, Result};
use nvsmi_watch::{CommandRunner, SmiQuery, SmiRunner};

use crate::config::{validate_effective_config, Config};

/// Runs every check and prints a report. Fails if any check failed.
pub async fn command_check(config: &Config) -> Result<()> {
    let query = SmiQuery::new(CommandRunner::new(config.smi_path()));
    let all_ok = run_checks(&query, config).await;

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        bail!("system check failed");
    }
}

async fn run_checks<R: SmiRunner>(query: &SmiQuery<R>, config: &Config) -> bool {
    println!("🔍 nvsmi-watch - System Check");
    println!("=============================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {e}");
            all_ok = false;
        }
    }

    println!("\n🖥️  Checking {} ...", config.smi_path());
    match query.discover_devices().await {
        Ok(devices) if devices.is_empty() => {
            println!("   ⚠️  nvidia-smi runs but reports no GPUs");
        }
        Ok(devices) => {
            println!("   ✅ {} GPU(s) detected", devices.len());
            for dev in &devices {
                println!("      ├─ {dev}");
            }
        }
        Err(e) => {
            println!("   ❌ {e}");
            // Nothing else can succeed without the tool.
            return false;
        }
    }

    println!("\n📊 Checking compute process query...");
    match query.query_processes().await {
        Ok(procs) => println!("   ✅ Query parsed, {} process(es) running", procs.len()),
        Err(e) => {
            println!("   ❌ {e}");
            all_ok = false;
        }
    }

    println!("\n⚡ Checking device metrics query...");
    match query.query_devices().await {
        Ok(devs) => {
            let na = devs
                .iter()
                .filter(|d| d.power_draw.is_none() || d.power_limit.is_none())
                .count();
            if na > 0 {
                println!("   ❌ {na} device(s) report N/A power; totals cannot be computed");
                all_ok = false;
            } else {
                println!("   ✅ Query parsed for {} device(s)", devs.len());
            }
        }
        Err(e) => {
            println!("   ❌ {e}");
            all_ok = false;
        }
    }

    all_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::CannedRunner;

    #[tokio::test]
    async fn test_checks_pass_with_working_tool() {
        let query = SmiQuery::new(CannedRunner::healthy());
        assert!(run_checks(&query, &Config::default()).await);
    }

    #[tokio::test]
    async fn test_checks_fail_without_tool() {
        let query = SmiQuery::new(CannedRunner::missing());
        assert!(!run_checks(&query, &Config::default()).await);
    }

    #[tokio::test]
    async fn test_checks_fail_on_na_power() {
        let query = SmiQuery::new(CannedRunner {
            gpus: "index, uuid, utilization.gpu [%], power.draw [W], power.max_limit [W]\n\
                   0, GPU-1, 12 %, [N/A], [N/A]\n",
            ..CannedRunner::healthy()
        });
        assert!(!run_checks(&query, &Config::default()).await);
    }

    #[tokio::test]
    async fn test_checks_fail_on_invalid_config() {
        let query = SmiQuery::new(CannedRunner::healthy());
        let config = Config {
            delay_seconds: Some(0.0),
            ..Config::default()
        };
        assert!(!run_checks(&query, &config).await);
    }
}
