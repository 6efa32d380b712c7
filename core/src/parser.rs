//! # Result Parser
//!
//! Turns the XML report written by the scanner into a [`ScanResult`].
//!
//! Parsing happens in two passes over the whole buffer:
//!
//! 1. A streaming pass with the `quick-xml` reader checks that the output is
//!    UTF-8, well formed, complete and rooted at `<nmaprun>`. Failures carry
//!    the byte offset where the problem was found.
//! 2. A serde pass decodes the raw [`schema`] and converts it into the typed
//!    model. Failures carry the path of the offending field.
//!
//! A result is only returned when both passes succeed.

mod schema;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use nmapr_common::error::{Result, ScanError};
use nmapr_common::result::{
    Address, ExtraPorts, Host, HostCounts, Hostname, OsMatch, Port, ScanInfo, ScanResult, Script,
    Service, Stats, Uptime,
};

const ROOT: &str = "nmaprun";

pub fn parse(raw: &[u8]) -> Result<ScanResult> {
    let xml = std::str::from_utf8(raw).map_err(|e| {
        ScanError::parse_at(e.valid_up_to() as u64, "output is not valid UTF-8")
    })?;

    check_structure(xml)?;

    let document: schema::NmapRun = quick_xml::de::from_str(xml)
        .map_err(|e| ScanError::parse_field(ROOT, e.to_string()))?;
    let result = convert(document)?;

    debug!(
        "Parsed scan report: {} hosts ({} up)",
        result.hosts.len(),
        result.stats.hosts.up
    );
    Ok(result)
}

fn check_structure(xml: &str) -> Result<()> {
    if xml.trim().is_empty() {
        return Err(ScanError::parse_at(0, "scanner produced no output"));
    }

    let mut reader = Reader::from_str(xml);
    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                if open.is_empty() {
                    check_root(&name, seen_root, position)?;
                    seen_root = true;
                }
                open.push(name);
            }
            Ok(Event::Empty(element)) => {
                if open.is_empty() {
                    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    check_root(&name, seen_root, position)?;
                    seen_root = true;
                }
            }
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ScanError::parse_at(reader.error_position() as u64, e.to_string()));
            }
        }
    }

    let end = xml.len() as u64;
    if let Some(name) = open.last() {
        return Err(ScanError::parse_at(
            end,
            format!("output ends inside <{name}>, the report is truncated"),
        ));
    }
    if !seen_root {
        return Err(ScanError::parse_at(end, format!("no <{ROOT}> element found")));
    }
    Ok(())
}

fn check_root(name: &str, seen_root: bool, position: u64) -> Result<()> {
    if seen_root {
        return Err(ScanError::parse_at(
            position,
            format!("unexpected <{name}> after the <{ROOT}> element"),
        ));
    }
    if name != ROOT {
        return Err(ScanError::parse_at(
            position,
            format!("expected <{ROOT}> as the root element, found <{name}>"),
        ));
    }
    Ok(())
}

fn convert(document: schema::NmapRun) -> Result<ScanResult> {
    let runstats = document.runstats.ok_or_else(|| {
        ScanError::parse_field("runstats", "missing run statistics, the report is incomplete")
    })?;

    let scan_info = document
        .scan_info
        .into_iter()
        .enumerate()
        .map(|(i, info)| convert_scan_info(info, &format!("scaninfo[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    let hosts = document
        .hosts
        .into_iter()
        .enumerate()
        .map(|(i, host)| convert_host(host, &format!("host[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanResult {
        scanner: required(document.scanner, "nmaprun@scanner")?,
        version: required(document.version, "nmaprun@version")?,
        args: document.args.unwrap_or_default(),
        start: number(document.start.as_deref(), "nmaprun@start")?,
        xml_output_version: document.xml_output_version,
        scan_info,
        verbose: level(document.verbose, "verbose@level")?,
        debugging: level(document.debugging, "debugging@level")?,
        hosts,
        stats: convert_stats(runstats)?,
    })
}

fn convert_scan_info(info: schema::ScanInfo, path: &str) -> Result<ScanInfo> {
    Ok(ScanInfo {
        scan_type: required(info.scan_type, &format!("{path}@type"))?,
        protocol: required(info.protocol, &format!("{path}@protocol"))?,
        num_services: number(info.num_services.as_deref(), &format!("{path}@numservices"))?
            .unwrap_or_default(),
        services: info.services.unwrap_or_default(),
    })
}

fn level(level: Option<schema::Level>, path: &str) -> Result<Option<u8>> {
    match level {
        Some(level) => number(level.level.as_deref(), path),
        None => Ok(None),
    }
}

fn convert_host(host: schema::Host, path: &str) -> Result<Host> {
    let status_path = format!("{path}.status");
    let status = host
        .status
        .ok_or_else(|| ScanError::parse_field(&status_path, "missing host status"))?;

    let addresses = host
        .addresses
        .into_iter()
        .enumerate()
        .map(|(i, address)| {
            let path = format!("{path}.address[{i}]");
            Ok(Address {
                addr: required(address.addr, &format!("{path}@addr"))?,
                kind: variant(address.addr_type.as_deref(), &format!("{path}@addrtype"))?,
                vendor: address.vendor,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let hostnames = host
        .hostnames
        .map(|names| names.hostnames)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, hostname)| {
            Ok(Hostname {
                name: required(hostname.name, &format!("{path}.hostnames.hostname[{i}]@name"))?,
                kind: hostname.kind,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (ports, extra_ports) = match host.ports {
        Some(ports) => convert_ports(ports, &format!("{path}.ports"))?,
        None => (Vec::new(), Vec::new()),
    };

    let os_matches = host
        .os
        .map(|os| os.matches)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, os_match)| {
            let path = format!("{path}.os.osmatch[{i}]");
            Ok(OsMatch {
                name: required(os_match.name, &format!("{path}@name"))?,
                accuracy: required_number(os_match.accuracy.as_deref(), &format!("{path}@accuracy"))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let uptime = match host.uptime {
        Some(uptime) => Some(Uptime {
            seconds: required_number(uptime.seconds.as_deref(), &format!("{path}.uptime@seconds"))?,
            last_boot: uptime.last_boot,
        }),
        None => None,
    };

    let distance = match host.distance {
        Some(distance) => number(distance.value.as_deref(), &format!("{path}.distance@value"))?,
        None => None,
    };

    Ok(Host {
        status: variant(status.state.as_deref(), &status_path)?,
        status_reason: status.reason.unwrap_or_default(),
        status_reason_ttl: number(status.reason_ttl.as_deref(), &format!("{status_path}@reason_ttl"))?,
        addresses,
        hostnames,
        ports,
        extra_ports,
        os_matches,
        uptime,
        distance,
        start_time: number(host.start_time.as_deref(), &format!("{path}@starttime"))?,
        end_time: number(host.end_time.as_deref(), &format!("{path}@endtime"))?,
    })
}

fn convert_ports(ports: schema::Ports, path: &str) -> Result<(Vec<Port>, Vec<ExtraPorts>)> {
    let extra_ports = ports
        .extra_ports
        .into_iter()
        .enumerate()
        .map(|(i, extra)| {
            let path = format!("{path}.extraports[{i}]");
            Ok(ExtraPorts {
                status: variant(extra.state.as_deref(), &format!("{path}@state"))?,
                count: required_number(extra.count.as_deref(), &format!("{path}@count"))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let ports = ports
        .ports
        .into_iter()
        .enumerate()
        .map(|(i, port)| convert_port(port, &format!("{path}.port[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok((ports, extra_ports))
}

fn convert_port(port: schema::Port, path: &str) -> Result<Port> {
    let state_path = format!("{path}.state");
    let state = port
        .state
        .ok_or_else(|| ScanError::parse_field(&state_path, "missing port state"))?;

    let service = match port.service {
        Some(service) => {
            let path = format!("{path}.service");
            Some(Service {
                name: service.name.unwrap_or_default(),
                product: service.product,
                version: service.version,
                extra_info: service.extra_info,
                os_type: service.os_type,
                method: service.method,
                confidence: number(service.confidence.as_deref(), &format!("{path}@conf"))?,
                tunnel: service.tunnel,
            })
        }
        None => None,
    };

    let scripts = port
        .scripts
        .into_iter()
        .enumerate()
        .map(|(i, script)| {
            Ok(Script {
                id: required(script.id, &format!("{path}.script[{i}]@id"))?,
                output: script.output.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Port {
        id: required_number(port.port_id.as_deref(), &format!("{path}@portid"))?,
        protocol: variant(port.protocol.as_deref(), &format!("{path}@protocol"))?,
        status: variant(state.state.as_deref(), &state_path)?,
        reason: state.reason.unwrap_or_default(),
        reason_ttl: number(state.reason_ttl.as_deref(), &format!("{state_path}@reason_ttl"))?,
        service,
        scripts,
    })
}

fn convert_stats(runstats: schema::RunStats) -> Result<Stats> {
    let finished = runstats.finished.ok_or_else(|| {
        ScanError::parse_field("runstats.finished", "missing finish record, the report is incomplete")
    })?;
    let counts = runstats
        .hosts
        .ok_or_else(|| ScanError::parse_field("runstats.hosts", "missing host counts"))?;

    let elapsed_secs: f64 = required_number(finished.elapsed.as_deref(), "runstats.finished@elapsed")?;
    let elapsed = Duration::try_from_secs_f64(elapsed_secs).map_err(|e| {
        ScanError::parse_field("runstats.finished@elapsed", format!("'{elapsed_secs}' is not a duration: {e}"))
    })?;

    Ok(Stats {
        hosts: HostCounts {
            up: required_number(counts.up.as_deref(), "runstats.hosts@up")?,
            down: required_number(counts.down.as_deref(), "runstats.hosts@down")?,
            total: required_number(counts.total.as_deref(), "runstats.hosts@total")?,
        },
        elapsed,
        finished_at: number(finished.time.as_deref(), "runstats.finished@time")?,
        finished_str: finished.time_str,
        summary: finished.summary,
        exit: variant(finished.exit.as_deref(), "runstats.finished@exit")?,
        error_message: finished.error_message,
    })
}

fn missing(path: &str) -> ScanError {
    ScanError::parse_field(path, "missing value")
}

fn required(value: Option<String>, path: &str) -> Result<String> {
    value.ok_or_else(|| missing(path))
}

fn number<T>(value: Option<&str>, path: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                ScanError::parse_field(path, format!("'{raw}' is not a valid number: {e}"))
            })
        })
        .transpose()
}

fn required_number<T>(value: Option<&str>, path: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    number(value, path)?.ok_or_else(|| missing(path))
}

fn variant<T>(value: Option<&str>, path: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value
        .ok_or_else(|| missing(path))?
        .parse()
        .map_err(|e: String| ScanError::parse_field(path, e))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
