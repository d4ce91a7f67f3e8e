//! `service`: control services through systemctl, or service and chkconfig
//! where systemd is absent.

use super::distro::ServiceManager;
use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    ActionResult, ActionSpec, Call, ExecContext, HandlerResult, Module, ModuleSpec, ParameterSpec,
};

/// `systemctl status` exit code for a unit that is loaded but not running.
const STATUS_INACTIVE: i32 = 3;

pub struct Service;

impl Module for Service {
    fn spec(&self) -> ModuleSpec {
        let simple = |name: &str, description: &str, example: &str, what: &str| {
            ActionSpec::new(name, description)
                .param(ParameterSpec::primary("name", "Service name, e.g. nginx"))
                .example(example, what)
        };

        ModuleSpec::new("service", "Start, stop, enable and inspect system services")
            .action(
                ActionSpec::new("list", "List services")
                    .param(ParameterSpec::primary("state", "all, running or failed").default("all"))
                    .note("Without systemd every service is listed whatever the state.")
                    .example("usc service list:failed", "Show failed units"),
            )
            .action(simple("start", "Start a service", "usc service start:nginx", "Start nginx"))
            .action(simple("stop", "Stop a service", "usc service stop:nginx", "Stop nginx"))
            .action(simple("restart", "Restart a service", "usc service restart:nginx", "Restart nginx"))
            .action(
                simple("status", "Show whether a service is running", "usc service status:nginx", "Is nginx running?")
                    .note("An inactive service is reported, not treated as an error."),
            )
            .action(
                simple("enable", "Start a service at boot", "usc service enable:nginx now:true", "Enable and start nginx")
                    .param(ParameterSpec::flag("now", "Also start it now")),
            )
            .action(
                simple("disable", "Stop starting a service at boot", "usc service disable:cups", "Disable cups")
                    .param(ParameterSpec::flag("now", "Also stop it now")),
            )
            .action(
                simple("mask", "Prevent a service from being started", "usc service mask:bluetooth", "Mask bluetooth")
                    .note("Requires systemd."),
            )
            .action(
                simple("unmask", "Allow a masked service to start again", "usc service unmask:bluetooth", "Unmask bluetooth")
                    .note("Requires systemd."),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        let manager = ServiceManager::detect(ctx)?;
        let name = call.action_value();

        match call.action.as_str() {
            "list" => {
                let state = call.value_in(&["all", "running", "failed"])?;
                Ok(ctx.run(&manager.list(state))?.into())
            }
            "start" | "stop" | "restart" | "mask" | "unmask" => {
                let cmd = manager.control(&call.action, name, ctx)?;
                Ok(ctx.run(&cmd)?.into())
            }
            "status" => status(manager, name, ctx),
            "enable" | "disable" => {
                let mut cmds = vec![manager.control(&call.action, name, ctx)?];
                if call.flag("now") {
                    let verb = if call.action == "enable" { "start" } else { "stop" };
                    cmds.push(manager.control(verb, name, ctx)?);
                }
                match ctx.run_all(&cmds)? {
                    Some(out) => Ok(out.into()),
                    None => Ok(ActionResult::ok("")),
                }
            }
            _ => Err(unhandled(call)),
        }
    }
}

fn status(manager: ServiceManager, name: &str, ctx: &ExecContext<'_>) -> HandlerResult {
    let out = ctx.probe(&manager.control("status", name, ctx)?)?;
    let active = match out.code {
        0 => true,
        STATUS_INACTIVE => false,
        _ => {
            return match out.check() {
                Ok(out) => Ok(out.into()),
                Err(e) => Err(e.into()),
            }
        }
    };
    let data = json!({ "name": name, "active": active, "output": out.stdout.trim_end() });
    Ok(ActionResult {
        success: true,
        exit_code: 0,
        ..ActionResult::from(out)
    }
    .with_data(data))
}
