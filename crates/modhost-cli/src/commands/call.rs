//! Loading a module and talking to it through its operation table

use colored::Colorize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use modhost_core::{ModuleHost, OperationInfo};
use modhost_logger as logger;

use crate::common::{load_with_dependencies, open_host};

const PUMP_INTERVAL: Duration = Duration::from_millis(10);

fn describe(operation: &OperationInfo) -> String {
    let params: Vec<String> = operation
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.kind))
        .collect();
    format!(
        "{}({}) -> {}",
        operation.name,
        params.join(", "),
        operation.return_kind
    )
}

/// Load `name` and print its operations.
pub fn inspect_module(name: &str) -> anyhow::Result<()> {
    let mut host = open_host()?;
    load_with_dependencies(&mut host, name)?;

    let operations = host.list_operations(name);
    println!("{} {}", "Operations of".bold().green(), name.bold());
    if operations.is_empty() {
        println!("  {}", "(none)".yellow());
    }
    for operation in &operations {
        if operation.invokable {
            println!("  {}", describe(operation));
        } else {
            println!("  {} {}", describe(operation), "[event]".cyan());
        }
    }
    Ok(())
}

/// Run posted jobs until `wait` has passed. A zero wait pumps once.
fn drain(host: &ModuleHost, wait: Duration) -> usize {
    let deadline = Instant::now() + wait;
    let mut ran = host.pump();
    while Instant::now() < deadline {
        thread::sleep(PUMP_INTERVAL);
        ran += host.pump();
    }
    ran
}

/// Load `name`, invoke `operation` with textual `args` and print the result.
pub fn call_operation(
    name: &str,
    operation: &str,
    args: &[String],
    wait: Duration,
) -> anyhow::Result<()> {
    let mut host = open_host()?;
    load_with_dependencies(&mut host, name)?;

    let values = host.parse_arguments(name, operation, args)?;
    logger::debug(&format!(
        "Calling {}.{} with {} argument(s)",
        name,
        operation,
        values.len()
    ));
    let result = host.invoke(name, operation, &values)?;

    let ran = drain(&host, wait);
    debug!(module = %name, "Ran {} deferred job(s)", ran);

    println!("{}", result);
    Ok(())
}
