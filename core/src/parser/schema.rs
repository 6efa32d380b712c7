//! Raw serde view of the nmap XML report.
//!
//! Every attribute is kept as an optional string so that decoding only fails
//! on structure. Values are checked during conversion, where the full path of
//! the offending field is known.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@scanner")]
    pub scanner: Option<String>,
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "@start")]
    pub start: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
    #[serde(rename = "@xmloutputversion")]
    pub xml_output_version: Option<String>,

    #[serde(rename = "scaninfo", default)]
    pub scan_info: Vec<ScanInfo>,
    pub verbose: Option<Level>,
    pub debugging: Option<Level>,

    #[serde(rename = "host", default)]
    pub hosts: Vec<Host>,

    pub runstats: Option<RunStats>,
}

#[derive(Debug, Deserialize)]
pub struct ScanInfo {
    #[serde(rename = "@type")]
    pub scan_type: Option<String>,
    #[serde(rename = "@protocol")]
    pub protocol: Option<String>,
    #[serde(rename = "@numservices")]
    pub num_services: Option<String>,
    #[serde(rename = "@services")]
    pub services: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Level {
    #[serde(rename = "@level")]
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    #[serde(rename = "@starttime")]
    pub start_time: Option<String>,
    #[serde(rename = "@endtime")]
    pub end_time: Option<String>,

    pub status: Option<Status>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
    pub ports: Option<Ports>,
    pub os: Option<Os>,
    pub uptime: Option<Uptime>,
    pub distance: Option<Distance>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(rename = "@state")]
    pub state: Option<String>,
    #[serde(rename = "@reason")]
    pub reason: Option<String>,
    #[serde(rename = "@reason_ttl")]
    pub reason_ttl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: Option<String>,
    #[serde(rename = "@addrtype")]
    pub addr_type: Option<String>,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Ports {
    #[serde(rename = "extraports", default)]
    pub extra_ports: Vec<ExtraPorts>,
    #[serde(rename = "port", default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub struct ExtraPorts {
    #[serde(rename = "@state")]
    pub state: Option<String>,
    #[serde(rename = "@count")]
    pub count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Port {
    #[serde(rename = "@protocol")]
    pub protocol: Option<String>,
    #[serde(rename = "@portid")]
    pub port_id: Option<String>,
    pub state: Option<Status>,
    pub service: Option<Service>,
    #[serde(rename = "script", default)]
    pub scripts: Vec<Script>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@product")]
    pub product: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
    #[serde(rename = "@extrainfo")]
    pub extra_info: Option<String>,
    #[serde(rename = "@ostype")]
    pub os_type: Option<String>,
    #[serde(rename = "@method")]
    pub method: Option<String>,
    #[serde(rename = "@conf")]
    pub confidence: Option<String>,
    #[serde(rename = "@tunnel")]
    pub tunnel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@output")]
    pub output: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Os {
    #[serde(rename = "osmatch", default)]
    pub matches: Vec<OsMatch>,
}

#[derive(Debug, Deserialize)]
pub struct OsMatch {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@accuracy")]
    pub accuracy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Uptime {
    #[serde(rename = "@seconds")]
    pub seconds: Option<String>,
    #[serde(rename = "@lastboot")]
    pub last_boot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Distance {
    #[serde(rename = "@value")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunStats {
    pub finished: Option<Finished>,
    pub hosts: Option<HostCounts>,
}

#[derive(Debug, Deserialize)]
pub struct Finished {
    #[serde(rename = "@time")]
    pub time: Option<String>,
    #[serde(rename = "@timestr")]
    pub time_str: Option<String>,
    #[serde(rename = "@elapsed")]
    pub elapsed: Option<String>,
    #[serde(rename = "@summary")]
    pub summary: Option<String>,
    #[serde(rename = "@exit")]
    pub exit: Option<String>,
    #[serde(rename = "@errormsg")]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HostCounts {
    #[serde(rename = "@up")]
    pub up: Option<String>,
    #[serde(rename = "@down")]
    pub down: Option<String>,
    #[serde(rename = "@total")]
    pub total: Option<String>,
}
