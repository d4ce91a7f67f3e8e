//! `system`: host information, journal, crontab and power state.

use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerResult, Module, ModuleSpec, ParameterSpec,
};
use usc_exec::CommandLine;

pub struct System;

impl Module for System {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("system", "Inspect the host, read logs, schedule jobs and change power state")
            .action(
                ActionSpec::new("info", "Show system information")
                    .param(
                        ParameterSpec::primary("item", "all, cpu, memory, disk, network or os")
                            .default("all"),
                    )
                    .param(ParameterSpec::flag("detail", "Show the full report where one exists"))
                    .example("usc system info:cpu detail:true", "Show lscpu output")
                    .example("usc system info", "Kernel, uptime, memory, disks and addresses"),
            )
            .action(
                ActionSpec::new("log", "Read the systemd journal")
                    .param(
                        ParameterSpec::primary("source", "system, kernel, service or auth")
                            .default("system"),
                    )
                    .param(ParameterSpec::named("name", "Unit name for the service source"))
                    .param(ParameterSpec::named("lines", "Show only the last N entries"))
                    .param(ParameterSpec::named("since", "Entries on or after this time, e.g. \"1 hour ago\""))
                    .param(ParameterSpec::named("until", "Entries on or before this time"))
                    .param(ParameterSpec::flag("follow", "Keep printing new entries until interrupted"))
                    .example("usc system log:service name:nginx lines:50", "Last 50 nginx entries")
                    .example("usc system log:kernel follow:true", "Follow the kernel log"),
            )
            .action(
                ActionSpec::new("cron", "List, add or clear crontab entries")
                    .param(ParameterSpec::primary("operation", "list, add or clear"))
                    .param(ParameterSpec::named("user", "Whose crontab; defaults to the caller"))
                    .param(ParameterSpec::named("expression", "Schedule, e.g. \"0 3 * * *\""))
                    .param(ParameterSpec::named("command", "Command to schedule"))
                    .note("`add` appends to the existing crontab.")
                    .note("`clear` removes the whole crontab.")
                    .example(
                        "usc system cron:add expression:\"0 3 * * *\" command:/usr/local/bin/backup",
                        "Run a backup every night at three",
                    ),
            )
            .action(
                ActionSpec::new("shutdown", "Shut down, reboot, halt or power off")
                    .param(ParameterSpec::primary("mode", "shutdown, reboot, halt or poweroff"))
                    .param(ParameterSpec::named("time", "When to shut down, e.g. +10 or 23:00").default("now"))
                    .param(ParameterSpec::named("message", "Wall message for logged-in users"))
                    .note("`time` and `message` apply to `shutdown` only.")
                    .example("usc system shutdown:shutdown time:+10 message:\"maintenance\"", "Shut down in ten minutes"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        match call.action.as_str() {
            "info" => info(call, ctx),
            "log" => log(call, ctx),
            "cron" => cron(call, ctx),
            "shutdown" => {
                let cmd = match call.value_in(&["shutdown", "reboot", "halt", "poweroff"])? {
                    "shutdown" => ctx
                        .privileged("shutdown")
                        .arg(call.get("time").unwrap_or("now"))
                        .args(call.get("message")),
                    other => ctx.privileged(other),
                };
                Ok(ctx.run(&cmd)?.into())
            }
            _ => Err(unhandled(call)),
        }
    }
}

fn info(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let item = call.value_in(&["all", "cpu", "memory", "disk", "network", "os"])?;
    let detail = call.flag("detail");

    let commands: Vec<CommandLine> = match item {
        "all" => vec![
            CommandLine::new("uname").arg("-a"),
            CommandLine::new("uptime"),
            CommandLine::new("free").arg("-h"),
            CommandLine::new("df").arg("-h"),
            CommandLine::new("ip").args(["addr", "show"]),
        ],
        "cpu" if detail => vec![CommandLine::new("lscpu")],
        "cpu" => vec![CommandLine::new("grep").args(["-m1", "model name", "/proc/cpuinfo"])],
        "memory" => vec![CommandLine::new("free").arg("-h")],
        "disk" => vec![CommandLine::new("df").arg("-h")],
        "network" => vec![CommandLine::new("ip").args(["addr", "show"])],
        _ if detail => vec![
            CommandLine::new("cat").arg("/etc/os-release"),
            CommandLine::new("uname").arg("-srm"),
        ],
        _ => vec![CommandLine::new("cat").arg("/etc/os-release")],
    };

    // one section per command, separated by a blank line
    let mut sections = Vec::with_capacity(commands.len());
    let mut last = None;
    for cmd in &commands {
        let out = ctx.run(cmd)?;
        sections.push(out.stdout.trim_end().to_string());
        last = Some(out);
    }
    let stdout = sections.join("\n\n") + "\n";

    let mut result = last.map(ActionResult::from).unwrap_or_default();
    result.stdout = stdout;
    result.command = Some(
        commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    );
    if commands.len() > 1 {
        result = result.with_data(json!({ "item": item, "sections": sections }));
    }
    Ok(result)
}

fn log(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let source = call.value_in(&["system", "kernel", "service", "auth"])?;
    let follow = call.flag("follow");

    let mut cmd = CommandLine::new("journalctl").arg("--no-pager");
    cmd = match source {
        "kernel" => cmd.arg("-k"),
        "service" => cmd.args(["-u", call.require("name", "`log:service` needs a unit name")?]),
        // auth and authpriv
        "auth" => cmd.args(["SYSLOG_FACILITY=4", "SYSLOG_FACILITY=10"]),
        _ => cmd,
    };
    let cmd = cmd
        .opt("-n", call.get("lines"))
        .opt("--since", call.get("since"))
        .opt("--until", call.get("until"))
        .arg_if(follow, "-f");

    if follow {
        Ok(ctx.follow(&cmd)?)
    } else {
        Ok(ctx.run(&cmd)?.into())
    }
}

fn cron(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let operation = call.value_in(&["list", "add", "clear"])?;
    let user = call.get("user");
    // another user's crontab needs root
    let crontab = || match user {
        Some(user) => ctx.privileged("crontab").args(["-u", user]),
        None => CommandLine::new("crontab"),
    };

    match operation {
        "list" => Ok(ctx.run(&crontab().arg("-l"))?.into()),
        "clear" => Ok(ctx.run(&crontab().arg("-r"))?.into()),
        _ => {
            let expression = call.require("expression", "`cron:add` needs a schedule")?;
            let command = call.require("command", "`cron:add` needs a command")?;

            // no crontab yet is a non-zero exit, not an error
            let current = ctx.probe(&crontab().arg("-l"))?;
            let mut table = if current.success() {
                current.stdout
            } else {
                String::new()
            };
            if !table.is_empty() && !table.ends_with('\n') {
                table.push('\n');
            }
            let entry = format!("{} {}", expression, command);
            table.push_str(&entry);
            table.push('\n');

            let out = ctx.run(&crontab().arg("-").stdin(table))?;
            Ok(ActionResult::from(out).with_data(json!({ "user": user, "entry": entry })))
        }
    }
}
