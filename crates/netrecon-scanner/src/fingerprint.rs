//! Fingerprinter (C9): classify a device from whatever identity it has
//! already accumulated — vendor, ports, hostname, web services — stopping
//! at the first rule that yields a non-unknown type. OS detection is a
//! separate, non-pure step (it shells out to an external tool, see
//! `port_scan::detect_os`) whose result is fed back in by the caller.

use netrecon_models::device::DeviceType;
use netrecon_models::port::Port;
use netrecon_models::web_service::WebService;

/// Everything the classifier is allowed to look at. A snapshot, not a live
/// handle — the Fingerprinter never mutates the device it was given.
pub struct ClassificationInput<'a> {
    pub vendor: Option<&'a str>,
    pub hostname: Option<&'a str>,
    pub ports: &'a [Port],
    pub web_services: &'a [WebService],
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    needles.iter().any(|n| haystack.contains(n))
}

fn has_port(ports: &[Port], numbers: &[&str]) -> bool {
    ports.iter().any(|p| numbers.contains(&p.number.as_str()))
}

fn has_service(ports: &[Port], needle: &str) -> bool {
    ports
        .iter()
        .any(|p| p.service.as_deref().map(|s| s.to_ascii_lowercase().contains(needle)).unwrap_or(false))
}

fn vendor_rule(vendor: &str) -> Option<DeviceType> {
    if contains_any(vendor, &["cisco", "netgear", "tp-link", "ubiquiti", "mikrotik"]) {
        Some(DeviceType::Router)
    } else if contains_any(vendor, &["synology", "qnap"]) {
        Some(DeviceType::Nas)
    } else if contains_any(vendor, &["hp", "canon", "epson"]) {
        Some(DeviceType::Printer)
    } else {
        None
    }
}

fn port_rule(ports: &[Port]) -> Option<DeviceType> {
    if has_port(ports, &["161", "23"]) {
        return Some(DeviceType::Router);
    }
    if has_port(ports, &["139", "445"]) && has_port(ports, &["548", "2049"]) {
        return Some(DeviceType::Nas);
    }
    if has_port(ports, &["80", "443"]) && has_port(ports, &["21", "22"]) {
        return Some(DeviceType::Server);
    }
    if has_port(ports, &["515", "631", "9100"]) {
        return Some(DeviceType::Printer);
    }
    if has_port(ports, &["554", "8080"]) || has_service(ports, "rtsp") {
        return Some(DeviceType::Camera);
    }
    if has_port(ports, &["5060", "5061"]) || has_service(ports, "sip") {
        return Some(DeviceType::Voip);
    }
    None
}

fn hostname_rule(hostname: &str) -> Option<DeviceType> {
    if contains_any(hostname, &["nas", "synology"]) {
        Some(DeviceType::Nas)
    } else if contains_any(hostname, &["router", "gateway", "ap-"]) {
        Some(DeviceType::Router)
    } else if contains_any(hostname, &["printer", "print", "hp-", "canon-"]) {
        Some(DeviceType::Printer)
    } else if contains_any(hostname, &["camera", "cam", "ipcam"]) {
        Some(DeviceType::Camera)
    } else if contains_any(hostname, &["server", "srv", "web", "db"]) {
        Some(DeviceType::Server)
    } else {
        None
    }
}

fn web_service_rule(services: &[WebService]) -> Option<DeviceType> {
    for service in services {
        let title = service.title.as_deref().unwrap_or("");
        let server = service.server.as_deref().unwrap_or("");
        for field in [title, server] {
            if contains_any(field, &["nas", "synology"]) {
                return Some(DeviceType::Nas);
            }
            if contains_any(field, &["router", "gateway"]) {
                return Some(DeviceType::Router);
            }
            if contains_any(field, &["printer"]) {
                return Some(DeviceType::Printer);
            }
            if contains_any(field, &["camera"]) {
                return Some(DeviceType::Camera);
            }
            if contains_any(field, &["server"]) {
                return Some(DeviceType::Server);
            }
        }
    }
    None
}

/// Apply vendor, port, hostname, then web-service rules in order, falling
/// back to `workstation` if none match (§4.9).
pub fn classify_device(input: &ClassificationInput) -> DeviceType {
    if let Some(vendor) = input.vendor {
        if let Some(t) = vendor_rule(vendor) {
            return t;
        }
    }
    if let Some(t) = port_rule(input.ports) {
        return t;
    }
    if let Some(hostname) = input.hostname {
        if let Some(t) = hostname_rule(hostname) {
            return t;
        }
    }
    if let Some(t) = web_service_rule(input.web_services) {
        return t;
    }
    DeviceType::Workstation
}

/// Clamp an OS-detection accuracy reading into the stored confidence
/// domain, `[0, 100]`.
pub fn accuracy_to_confidence(accuracy: f64) -> f64 {
    accuracy.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_models::port::{PortProtocol, PortState};
    use netrecon_models::web_service::WebProtocol;

    fn port(number: u16, state: PortState) -> Port {
        Port::new("dev-1".into(), number, PortProtocol::Tcp, state)
    }

    fn empty_input<'a>(ports: &'a [Port]) -> ClassificationInput<'a> {
        ClassificationInput {
            vendor: None,
            hostname: None,
            ports,
            web_services: &[],
        }
    }

    #[test]
    fn test_vendor_rule_wins_first() {
        let ports = vec![port(9100, PortState::Open)]; // would otherwise be Printer via port rule
        let input = ClassificationInput {
            vendor: Some("Cisco Systems"),
            hostname: None,
            ports: &ports,
            web_services: &[],
        };
        assert_eq!(classify_device(&input), DeviceType::Router);
    }

    #[test]
    fn test_port_rule_printer() {
        let ports = vec![port(9100, PortState::Open)];
        assert_eq!(classify_device(&empty_input(&ports)), DeviceType::Printer);
    }

    #[test]
    fn test_port_rule_nas_requires_both_sides() {
        let smb_only = vec![port(445, PortState::Open)];
        assert_eq!(classify_device(&empty_input(&smb_only)), DeviceType::Workstation);

        let smb_and_nfs = vec![port(445, PortState::Open), port(2049, PortState::Open)];
        assert_eq!(classify_device(&empty_input(&smb_and_nfs)), DeviceType::Nas);
    }

    #[test]
    fn test_port_rule_server_requires_web_and_admin() {
        let web_only = vec![port(80, PortState::Open)];
        assert_eq!(classify_device(&empty_input(&web_only)), DeviceType::Workstation);

        let web_and_ssh = vec![port(80, PortState::Open), port(22, PortState::Open)];
        assert_eq!(classify_device(&empty_input(&web_and_ssh)), DeviceType::Server);
    }

    #[test]
    fn test_hostname_rule() {
        let ports: Vec<Port> = vec![];
        let input = ClassificationInput {
            vendor: None,
            hostname: Some("printer-office-2f"),
            ports: &ports,
            web_services: &[],
        };
        assert_eq!(classify_device(&input), DeviceType::Printer);
    }

    #[test]
    fn test_web_service_rule() {
        let ports: Vec<Port> = vec![];
        let mut ws = WebService::new("dev-1".into(), "http://x/".into(), "80".into(), WebProtocol::Http);
        ws.title = Some("Synology DiskStation".into());
        let input = ClassificationInput {
            vendor: None,
            hostname: None,
            ports: &ports,
            web_services: std::slice::from_ref(&ws),
        };
        assert_eq!(classify_device(&input), DeviceType::Nas);
    }

    #[test]
    fn test_default_workstation() {
        let ports: Vec<Port> = vec![];
        assert_eq!(classify_device(&empty_input(&ports)), DeviceType::Workstation);
    }

    #[test]
    fn test_accuracy_to_confidence() {
        assert!((accuracy_to_confidence(95.0) - 95.0).abs() < f64::EPSILON);
        assert_eq!(accuracy_to_confidence(150.0), 100.0);
        assert_eq!(accuracy_to_confidence(-10.0), 0.0);
    }
}
