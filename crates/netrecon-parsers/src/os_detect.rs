//! OS-detector XML output parser (§6).
//!
//! Contract: `<osmatch name accuracy><osclass vendor osfamily osgen/></osmatch>`,
//! repeated once per candidate match in descending accuracy order. Only the
//! top match is kept — the Fingerprinter (C9) wants one OS guess per device,
//! not a ranked list.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// The best OS match found in a detector report.
#[derive(Debug, Clone, PartialEq)]
pub struct OsMatch {
    pub name: String,
    pub accuracy: f64,
    pub family: Option<String>,
}

/// Parse an OS detector's XML report, returning the highest-accuracy match.
/// `osmatch` elements are assumed to already be sorted by the tool in
/// descending accuracy order, matching the convention of the tools this
/// format was modeled on; the first one found wins.
pub fn parse_os_detect_xml(xml_data: &str) -> Result<Option<OsMatch>, String> {
    let mut reader = Reader::from_str(xml_data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<OsMatch> = None;
    let mut in_match = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "osmatch" if current.is_none() => {
                        in_match = true;
                        let mut match_name = String::new();
                        let mut accuracy = 0.0;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" => match_name = String::from_utf8_lossy(&attr.value).to_string(),
                                b"accuracy" => {
                                    accuracy = String::from_utf8_lossy(&attr.value)
                                        .parse()
                                        .unwrap_or(0.0);
                                }
                                _ => {}
                            }
                        }
                        current = Some(OsMatch {
                            name: match_name,
                            accuracy,
                            family: None,
                        });
                    }
                    "osclass" if in_match => {
                        if let Some(ref mut m) = current {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"osfamily" {
                                    m.family = Some(String::from_utf8_lossy(&attr.value).to_string());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"osmatch" {
                    in_match = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(current)
}
