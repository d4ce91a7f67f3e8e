//! `process`: inspect and signal processes through procps and util-linux.

use super::unhandled;
use usc_dispatch::{
    one_of, ActionSpec, Call, ExecContext, HandlerError, HandlerResult, Module, ModuleSpec,
    ParameterSpec,
};
use usc_exec::CommandLine;

const DETAIL_COLUMNS: &str = "pid,ppid,user,%cpu,%mem,vsz,rss,tty,stat,start,time,command";

pub struct Process;

impl Module for Process {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("process", "List, inspect, signal and limit processes")
            .action(
                ActionSpec::new("list", "List processes")
                    .param(ParameterSpec::primary("scope", "all").default("all"))
                    .param(ParameterSpec::named("user", "Only processes of this user"))
                    .param(ParameterSpec::named(
                        "sort",
                        "cpu, mem, pid, time, or any ps sort key; highest cpu and mem first",
                    ))
                    .example("usc process list:all user:chenxi", "List chenxi's processes")
                    .example("usc process list sort:mem", "Largest memory users first"),
            )
            .action(
                ActionSpec::new("kill", "Send a signal to a process")
                    .param(ParameterSpec::primary("pid", "Process id"))
                    .param(ParameterSpec::named("signal", "Signal name or number").default("15"))
                    .param(ParameterSpec::flag("force", "Send SIGKILL"))
                    .example("usc process kill:4242 signal:HUP", "Ask a daemon to reload"),
            )
            .action(
                ActionSpec::new("tree", "Show the process tree")
                    .param(ParameterSpec::primary("pid", "Root of the tree; defaults to init").optional())
                    .param(ParameterSpec::named("format", "pid, user or compact"))
                    .example("usc process tree format:pid", "Whole tree with process ids"),
            )
            .action(
                ActionSpec::new("search", "Find processes by name")
                    .param(ParameterSpec::primary("name", "Name pattern"))
                    .param(ParameterSpec::flag("exact", "Match the whole name"))
                    .param(ParameterSpec::named("user", "Only processes of this user"))
                    .example("usc process search:nginx", "Find nginx processes"),
            )
            .action(
                ActionSpec::new("info", "Show one process")
                    .param(ParameterSpec::primary("pid", "Process id"))
                    .param(ParameterSpec::flag("detail", "Show memory, cpu, terminal and start time"))
                    .example("usc process info:1 detail:true", "Inspect init"),
            )
            .action(
                ActionSpec::new("nice", "Change a process's scheduling priority")
                    .param(ParameterSpec::primary("pid", "Process id"))
                    .param(ParameterSpec::named("priority", "Niceness from -20 (highest) to 19"))
                    .example("usc process nice:4242 priority:10", "Lower a process's priority"),
            )
            .action(
                ActionSpec::new("limit", "Change a running process's resource limit")
                    .param(ParameterSpec::primary("pid", "Process id"))
                    .param(ParameterSpec::named("resource", "cpu, memory, nofile or nproc"))
                    .param(ParameterSpec::named("value", "New limit, soft:hard or a single value"))
                    .example("usc process limit:4242 resource:nofile value:4096", "Raise the open file limit"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        let cmd = match call.action.as_str() {
            "list" => list(call)?,
            "kill" => {
                let signal = if call.flag("force") {
                    "9"
                } else {
                    call.get("signal").unwrap_or("15")
                };
                CommandLine::new("kill")
                    .arg(format!("-{}", signal.trim_start_matches('-')))
                    .arg(pid(call)?)
            }
            "tree" => {
                let format = match call.get("format") {
                    Some(f) => Some(match one_of("format", f, &["pid", "user", "compact"])? {
                        "pid" => "-p",
                        "user" => "-u",
                        _ => "-c",
                    }),
                    None => None,
                };
                let root = match call.action_value() {
                    "" => None,
                    _ => Some(pid(call)?),
                };
                CommandLine::new("pstree").args(format).args(root)
            }
            "search" => CommandLine::new("pgrep")
                .arg_if(call.flag("exact"), "-x")
                .opt("-u", call.get("user"))
                .arg("-l")
                .arg(call.action_value()),
            "info" => CommandLine::new("ps")
                .args(["-p", pid(call)?])
                .args(call.flag("detail").then_some(["-o", DETAIL_COLUMNS]).into_iter().flatten()),
            "nice" => {
                let priority = call.require("priority", "`process nice` needs a priority")?;
                if priority.parse::<i8>().map_or(true, |p| !(-20..=19).contains(&p)) {
                    return Err(HandlerError::invalid("priority", priority, "an integer from -20 to 19"));
                }
                ctx.privileged("renice").args([priority, "-p", pid(call)?])
            }
            "limit" => {
                let resource = call.require("resource", "`process limit` needs a resource")?;
                let value = call.require("value", "`process limit` needs a value")?;
                let flag = match one_of("resource", resource, &["cpu", "memory", "nofile", "nproc"])? {
                    "cpu" => "--cpu",
                    "memory" => "--as",
                    "nofile" => "--nofile",
                    _ => "--nproc",
                };
                ctx.privileged("prlimit")
                    .arg(format!("{}={}", flag, value))
                    .args(["--pid", pid(call)?])
            }
            _ => return Err(unhandled(call)),
        };
        Ok(ctx.run(&cmd)?.into())
    }
}

fn list(call: &Call) -> Result<CommandLine, HandlerError> {
    call.value_in(&["all"])?;
    let cmd = match call.get("user") {
        Some(user) => CommandLine::new("ps").args(["u", "-U", user, "-u", user]),
        None => CommandLine::new("ps").arg("aux"),
    };
    let sort = call.get("sort").map(|key| match key {
        "cpu" => "-%cpu",
        "mem" => "-%mem",
        other => other,
    });
    Ok(cmd.args(sort.map(|key| format!("--sort={}", key))))
}

/// The action value, checked to be a process id.
fn pid(call: &Call) -> Result<&str, HandlerError> {
    let value = call.action_value();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(value)
    } else {
        Err(HandlerError::invalid("pid", value, "a numeric process id"))
    }
}
