//! `network`: interfaces, sockets, firewall and routes through iproute2,
//! iptables, dig and nmap.

use super::unhandled;
use serde_json::json;
use usc_dispatch::{
    one_of, ActionResult, ActionSpec, Call, ExecContext, HandlerError, HandlerResult, Module,
    ModuleSpec, ParameterSpec,
};
use usc_exec::CommandLine;

pub struct Network;

impl Module for Network {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("network", "Configure interfaces, routes, firewall rules and name lookups")
            .action(
                ActionSpec::new("iface", "Bring interfaces up or down, show or address them")
                    .param(ParameterSpec::primary("operation", "up, down, show or config"))
                    .param(ParameterSpec::named("name", "Interface name, e.g. eth0"))
                    .param(ParameterSpec::named("ip", "Address to assign (config)"))
                    .param(ParameterSpec::named("mask", "Prefix length for `ip`").default("24"))
                    .param(ParameterSpec::named("gateway", "Default gateway (config)"))
                    .note("`show` without `name` lists every interface.")
                    .example("usc network iface:up name:eth0", "Bring eth0 up")
                    .example(
                        "usc network iface:config name:eth0 ip:192.168.1.20 gateway:192.168.1.1",
                        "Assign an address and a default route",
                    ),
            )
            .action(
                ActionSpec::new("conn", "List sockets")
                    .param(ParameterSpec::primary("operation", "list").default("list"))
                    .param(ParameterSpec::named("proto", "tcp or udp"))
                    .param(ParameterSpec::named("state", "Socket state filter, e.g. established"))
                    .param(ParameterSpec::named("port", "Local port"))
                    .example("usc network conn:list proto:tcp port:22", "Show TCP sockets on port 22"),
            )
            .action(
                ActionSpec::new("ping", "Send ICMP echo requests")
                    .param(ParameterSpec::primary("host", "Host name or address"))
                    .param(ParameterSpec::named("count", "Stop after this many requests"))
                    .param(ParameterSpec::named("interval", "Seconds between requests"))
                    .param(ParameterSpec::named("size", "Payload size in bytes"))
                    .note("Without `count`, ping runs until interrupted.")
                    .example("usc network ping:example.com count:4", "Send four pings"),
            )
            .action(
                ActionSpec::new("firewall", "List, add or delete iptables rules")
                    .param(ParameterSpec::primary("operation", "list, add or del"))
                    .param(ParameterSpec::named("rule", "Rule specification, e.g. \"-p tcp --dport 80 -j ACCEPT\""))
                    .param(ParameterSpec::named("chain", "Chain name (INPUT when adding or deleting)"))
                    .param(ParameterSpec::named("table", "Table name (filter when adding or deleting)"))
                    .example(
                        "usc network firewall:add rule:\"-p tcp --dport 80 -j ACCEPT\"",
                        "Accept HTTP on the INPUT chain",
                    ),
            )
            .action(
                ActionSpec::new("dns", "Query DNS records")
                    .param(ParameterSpec::primary("operation", "query").default("query"))
                    .param(ParameterSpec::named("domain", "Name to look up"))
                    .param(ParameterSpec::named("server", "Name server to ask"))
                    .example("usc network dns:query domain:example.com server:1.1.1.1", "Ask 1.1.1.1 for example.com"),
            )
            .action(
                ActionSpec::new("route", "List, add or delete routes")
                    .param(ParameterSpec::primary("operation", "list, add or del"))
                    .param(ParameterSpec::named("destination", "Network, e.g. 10.0.0.0/8, or default"))
                    .param(ParameterSpec::named("gateway", "Next hop"))
                    .param(ParameterSpec::named("device", "Outgoing interface"))
                    .example(
                        "usc network route:add destination:10.0.0.0/8 gateway:192.168.1.254",
                        "Route 10/8 through a local router",
                    ),
            )
            .action(
                ActionSpec::new("scan", "Scan hosts and ports with nmap")
                    .param(ParameterSpec::primary("target", "Host, address or network"))
                    .param(ParameterSpec::named("ports", "Ports, e.g. 22,80,8000-8100"))
                    .param(ParameterSpec::named("type", "syn, udp or ping"))
                    .param(ParameterSpec::named("speed", "Timing template 0 (slowest) to 5 (fastest)"))
                    .example("usc network scan:192.168.1.0/24 type:ping", "Find live hosts on a subnet"),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        match call.action.as_str() {
            "iface" => iface(call, ctx),
            "conn" => conn(call, ctx),
            "ping" => ping(call, ctx),
            "firewall" => firewall(call, ctx),
            "dns" => {
                call.value_in(&["query"])?;
                let domain = call.require("domain", "`network dns:query` needs a domain")?;
                let cmd = CommandLine::new("dig")
                    .args(call.get("server").map(|s| format!("@{}", s)))
                    .arg(domain);
                Ok(ctx.run(&cmd)?.into())
            }
            "route" => route(call, ctx),
            "scan" => scan(call, ctx),
            _ => Err(unhandled(call)),
        }
    }
}

fn iface(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let operation = call.value_in(&["up", "down", "show", "config"])?;
    let name_needed = || call.require("name", "the interface must be named");

    match operation {
        "up" | "down" => {
            let name = name_needed()?;
            let cmd = ctx.privileged("ip").args(["link", "set", name, operation]);
            Ok(ctx.run(&cmd)?.into())
        }
        "show" => {
            let cmd = CommandLine::new("ip").args(["addr", "show"]).args(call.get("name"));
            Ok(ctx.run(&cmd)?.into())
        }
        _ => {
            let name = name_needed()?;
            let mut cmds = Vec::new();
            if let Some(ip) = call.get("ip") {
                let mask = call.get("mask").unwrap_or("24");
                cmds.push(ctx.privileged("ip").args([
                    "addr".to_string(),
                    "add".to_string(),
                    format!("{}/{}", ip, mask),
                    "dev".to_string(),
                    name.to_string(),
                ]));
            }
            if let Some(gateway) = call.get("gateway") {
                cmds.push(ctx.privileged("ip").args(["route", "add", "default", "via", gateway]));
            }
            match ctx.run_all(&cmds)? {
                Some(out) => Ok(ActionResult::from(out).with_data(json!({
                    "name": name,
                    "ip": call.get("ip"),
                    "gateway": call.get("gateway"),
                }))),
                None => Err(HandlerError::missing("ip|gateway", "`iface:config` needs an address or a gateway")),
            }
        }
    }
}

fn conn(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    call.value_in(&["list"])?;
    let proto = call
        .get("proto")
        .map(|p| one_of("proto", p, &["tcp", "udp"]))
        .transpose()?;

    let cmd = CommandLine::new("ss")
        .args(proto.map(|p| if p == "tcp" { "-t" } else { "-u" }))
        .opt("state", call.get("state"))
        .args(call.get("port").map(|port| format!("sport = :{}", port)));
    Ok(ctx.run(&cmd)?.into())
}

fn ping(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let count = call.get("count");
    let cmd = CommandLine::new("ping")
        .opt("-c", count)
        .opt("-i", call.get("interval"))
        .opt("-s", call.get("size"))
        .arg(call.action_value());

    if count.is_some() {
        Ok(ctx.run(&cmd)?.into())
    } else {
        Ok(ctx.follow(&cmd)?)
    }
}

fn firewall(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let operation = call.value_in(&["list", "add", "del"])?;
    if operation == "list" {
        let cmd = ctx
            .privileged("iptables")
            .arg("-L")
            .opt("-t", call.get("table"))
            .args(call.get("chain"));
        return Ok(ctx.run(&cmd)?.into());
    }

    let rule = call.require("rule", "adding or deleting a firewall rule needs `rule`")?;
    let cmd = ctx
        .privileged("iptables")
        .args(["-t", call.get("table").unwrap_or("filter")])
        .arg(if operation == "add" { "-A" } else { "-D" })
        .arg(call.get("chain").unwrap_or("INPUT"))
        .args(rule.split_whitespace());
    Ok(ctx.run(&cmd)?.into())
}

fn route(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let operation = call.value_in(&["list", "add", "del"])?;
    let cmd = match operation {
        "list" => CommandLine::new("ip").args(["route", "show"]),
        "add" => {
            let destination = call.require("destination", "`route:add` needs a destination")?;
            ctx.privileged("ip")
                .args(["route", "add", destination])
                .opt("via", call.get("gateway"))
                .opt("dev", call.get("device"))
        }
        _ => {
            let destination = call.require("destination", "`route:del` needs a destination")?;
            ctx.privileged("ip").args(["route", "del", destination])
        }
    };
    Ok(ctx.run(&cmd)?.into())
}

fn scan(call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
    let kind = match call.get("type") {
        Some(t) => Some(match one_of("type", t, &["syn", "udp", "ping"])? {
            "syn" => "-sS",
            "udp" => "-sU",
            _ => "-sn",
        }),
        None => None,
    };
    let speed = call
        .get("speed")
        .map(|s| one_of("speed", s, &["0", "1", "2", "3", "4", "5"]))
        .transpose()?;

    let cmd = CommandLine::new("nmap")
        .opt("-p", call.get("ports"))
        .args(kind)
        .opt("-T", speed)
        .arg(call.action_value());
    Ok(ctx.run(&cmd)?.into())
}
