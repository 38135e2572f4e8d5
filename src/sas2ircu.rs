//! Parser for `sas2ircu` output (LSI SAS2 controllers).
//!
//! `sas2ircu <id> DISPLAY` prints a fixed sequence of dash-rule-delimited
//! sections. The dump is split structurally first, then the IR-volume and
//! physical-device bodies are split into blank-line-delimited records, and
//! each record is scanned with an ordered field map. Unlike `mpt-status`,
//! this tool reports state as free text, so health is a single boolean
//! classification against known-good phrasings instead of a one-hot
//! expansion.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::metric::{Labels, Metric, MetricDesc};
use crate::split::split_by_empty_line;

pub static STATE_OK: MetricDesc =
    MetricDesc::gauge("sas2ircu_state_ok", "reports whether device state is ok");

/// A structural failure of the dump layout or of a required-field invariant.
/// Always fatal for the run; partial results are never returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected {expected} sections but got {got}")]
    SectionCount { expected: usize, got: usize },
    #[error("section {index} does not look like '{expected}'")]
    SectionMismatch {
        index: usize,
        expected: &'static str,
    },
    #[error("duplicate attribute '{attr}' in {record} record: {lines:?}")]
    DuplicateField {
        record: &'static str,
        attr: &'static str,
        lines: Vec<String>,
    },
    #[error("failed to parse all attributes of {record}: missing {missing:?} in {lines:?}")]
    MissingFields {
        record: &'static str,
        missing: Vec<&'static str>,
        lines: Vec<String>,
    },
}

static PATTERNS: LazyLock<DisplayPatterns> = LazyLock::new(DisplayPatterns::new);

struct DisplayPatterns {
    // Horizontal rule between sections.
    rule: Regex,
    // Section headers, validated positionally.
    controller_header: Regex,
    volume_header: Regex,
    physical_header: Regex,
    enclosure_header: Regex,
    // `sas2ircu LIST` identifier lines.
    probe_id: Regex,
    // Field maps.
    volume_fields: Vec<FieldPattern>,
    physical_fields: Vec<FieldPattern>,
    // Known-good state phrasings, full-match on the trimmed state text.
    volume_ok: Vec<Regex>,
    physical_ok: Vec<Regex>,
    // Physical-device parts that are not disks.
    physical_skip: Vec<Regex>,
}

struct FieldPattern {
    attr: &'static str,
    regex: Regex,
}

impl FieldPattern {
    fn new(attr: &'static str, pattern: &str) -> Self {
        Self {
            attr,
            regex: Regex::new(pattern).expect("static regex must compile"),
        }
    }
}

fn pattern(raw: &str) -> Regex {
    Regex::new(raw).expect("static regex must compile")
}

impl DisplayPatterns {
    fn new() -> Self {
        Self {
            rule: pattern(r"-{2,}\n"),
            controller_header: pattern(r"(?i)^\s*Controller\s+information\s*$"),
            volume_header: pattern(r"(?i)^\s*IR\s+Volume\s+information\s*$"),
            physical_header: pattern(r"(?i)^\s*Physical\s+device\s+information\s*$"),
            enclosure_header: pattern(r"(?i)^\s*Enclosure\s+information\s*$"),
            probe_id: pattern(r"^\s*(\d+)"),
            volume_fields: vec![
                FieldPattern::new("volume_num", r"(?i)^\s*IR\s+volume\s+(\d+)"),
                FieldPattern::new("volume_id", r"(?i)^\s*Volume\s+ID\s*:\s*(\d+)"),
                FieldPattern::new("state", r"(?i)^\s*Status\s+of\s+volume\s*:(.+)"),
                FieldPattern::new("raidlevel", r"(?i)^\s*RAID\s+level\s*:\s*(\w+)"),
            ],
            physical_fields: vec![
                FieldPattern::new("enclosure", r"(?i)^\s*Enclosure\s+#\s*:\s*(\d+)"),
                FieldPattern::new("slot", r"(?i)^\s*Slot\s+#\s*:\s*(\d+)"),
                FieldPattern::new("state", r"(?i)^\s*State\s*:(.+)"),
                FieldPattern::new("model", r"(?i)^\s*Model\s+Number\s*:\s*(\w[-\w\s]+?)\s*$"),
            ],
            volume_ok: vec![pattern(r"(?i)^(?:Inactive,\s*)?Okay\s*\(OKY\)$")],
            physical_ok: vec![
                pattern(r"(?i)^Optimal\s*\(OPT\)$"),
                pattern(r"(?i)^Ready\s*\(RDY\)$"),
            ],
            physical_skip: vec![
                pattern(r"(?i)^Initiator\s+at\s+ID\s+#"),
                pattern(r"(?i)^Device\s+is\s+a\s+Enclosure\s+services\s+device"),
            ],
        }
    }
}

/// The informationally relevant bodies of one DISPLAY dump. Controller and
/// enclosure bodies carry no metric content and are discarded at the split.
#[derive(Debug)]
pub struct DisplaySections<'a> {
    pub ir_volume: &'a str,
    pub physical_device: &'a str,
}

/// Number of segments a DISPLAY dump splits into on the dash rule: preamble,
/// four header/body pairs, postamble.
const EXPECTED_SECTIONS: usize = 10;

/// Splits a DISPLAY dump into its fixed section layout, validating segment
/// count and header order. Never returns a partial layout.
pub fn split_display_sections(text: &str) -> Result<DisplaySections<'_>, ParseError> {
    let parts: Vec<&str> = PATTERNS.rule.split(text).collect();
    if parts.len() != EXPECTED_SECTIONS {
        return Err(ParseError::SectionCount {
            expected: EXPECTED_SECTIONS,
            got: parts.len(),
        });
    }

    let headers: [(usize, &Regex, &'static str); 4] = [
        (1, &PATTERNS.controller_header, "Controller information"),
        (3, &PATTERNS.volume_header, "IR Volume information"),
        (5, &PATTERNS.physical_header, "Physical device information"),
        (7, &PATTERNS.enclosure_header, "Enclosure information"),
    ];
    for (index, header, expected) in headers {
        if !header.is_match(parts[index]) {
            return Err(ParseError::SectionMismatch { index, expected });
        }
    }

    Ok(DisplaySections {
        ir_volume: parts[4],
        physical_device: parts[6],
    })
}

/// Scans one blank-line-delimited record with an ordered field map. Every
/// field must be populated exactly once; the `state` field is classified
/// against `ok_states` into the 0/1 metric value, all others become labels.
fn scan_record(
    lines: &[&str],
    fields: &[FieldPattern],
    ok_states: &[Regex],
    record: &'static str,
    device: &'static str,
) -> Result<Metric, ParseError> {
    let mut labels = Labels::new();
    labels.insert("device".to_string(), device.to_string());
    let mut value: Option<bool> = None;

    for line in lines {
        for field in fields {
            let Some(caps) = field.regex.captures(line) else {
                continue;
            };
            let duplicate = if field.attr == "state" {
                let state = caps[1].trim();
                let ok = ok_states.iter().any(|re| re.is_match(state));
                value.replace(ok).is_some()
            } else {
                labels
                    .insert(field.attr.to_string(), caps[1].to_string())
                    .is_some()
            };
            if duplicate {
                return Err(ParseError::DuplicateField {
                    record,
                    attr: field.attr,
                    lines: owned(lines),
                });
            }
        }
    }

    let missing: Vec<&'static str> = fields
        .iter()
        .map(|f| f.attr)
        .filter(|attr| {
            if *attr == "state" {
                value.is_none()
            } else {
                !labels.contains_key(*attr)
            }
        })
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingFields {
            record,
            missing,
            lines: owned(lines),
        });
    }

    Ok(Metric::new(
        &STATE_OK,
        labels,
        if value.unwrap_or(false) { "1" } else { "0" },
    ))
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

/// Parses the "IR Volume information" body into one `sas2ircu_state_ok`
/// observation per volume. An empty body yields no observations.
pub fn parse_ir_volume_sect(text: &str) -> Result<Vec<Metric>, ParseError> {
    split_by_empty_line(text)
        .iter()
        .map(|part| {
            scan_record(
                part,
                &PATTERNS.volume_fields,
                &PATTERNS.volume_ok,
                "IR volume",
                "logical",
            )
        })
        .collect()
}

/// Parses the "Physical device information" body. Initiator and enclosure
/// services entries are not disks and are skipped.
pub fn parse_phys_device_sect(text: &str) -> Result<Vec<Metric>, ParseError> {
    split_by_empty_line(text)
        .iter()
        .filter(|part| {
            !PATTERNS
                .physical_skip
                .iter()
                .any(|re| re.is_match(part[0]))
        })
        .map(|part| {
            scan_record(
                part,
                &PATTERNS.physical_fields,
                &PATTERNS.physical_ok,
                "physical device",
                "physical",
            )
        })
        .collect()
}

/// Parses one controller's full DISPLAY dump into metrics, tagging every
/// observation with the controller identifier.
pub fn parse_display(controller_id: &str, text: &str) -> Result<Vec<Metric>, ParseError> {
    let sections = split_display_sections(text)?;
    let mut metrics = parse_ir_volume_sect(sections.ir_volume)?;
    metrics.extend(parse_phys_device_sect(sections.physical_device)?);
    for metric in &mut metrics {
        metric
            .labels
            .insert("controller_id".to_string(), controller_id.to_string());
    }
    debug!(
        controller_id,
        metrics = metrics.len(),
        "parsed controller display"
    );
    Ok(metrics)
}

/// Extracts controller identifiers from `sas2ircu LIST` output: the leading
/// integer of each adapter table row.
pub fn parse_probe_output(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| PATTERNS.probe_id.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOLUME_SECT: &str = "\n\
IR volume 1\n\
  Volume ID                               : 79\n\
  Status of volume                        : Okay (OKY)\n\
  Volume wwid                             : 0db809246c9f0e2a\n\
  RAID level                              : RAID1\n\
  Size (in MB)                            : 476416\n\
  Physical hard disks                     :\n\
  PHY[0] Enclosure#/Slot#                 : 1:0\n\
  PHY[1] Enclosure#/Slot#                 : 1:1\n\
\n\
IR volume 2\n\
  Volume ID                               : 80\n\
  Status of volume                        : Inactive, Okay (OKY)\n\
  Volume wwid                             : 0db809246c9f0e2a\n\
  RAID level                              : RAID1\n\
  Size (in MB)                            : 476416\n\
  Physical hard disks                     :\n\
  PHY[0] Enclosure#/Slot#                 : 1:0\n\
  PHY[1] Enclosure#/Slot#                 : 1:1\n";

    #[test]
    fn test_volume_section_state_ok_and_inactive_prefix() {
        let metrics = parse_ir_volume_sect(VOLUME_SECT).unwrap();
        let lines: Vec<String> = metrics.iter().map(Metric::render).collect();
        assert_eq!(
            lines,
            vec![
                r#"sas2ircu_state_ok{device="logical", raidlevel="RAID1", volume_id="79", volume_num="1"} 1"#,
                r#"sas2ircu_state_ok{device="logical", raidlevel="RAID1", volume_id="80", volume_num="2"} 1"#,
            ]
        );
    }

    #[test]
    fn test_volume_other_phrasing_is_not_ok() {
        let sect = "\
IR volume 1\n\
  Volume ID                               : 79\n\
  Status of volume                        : Degraded (DGD)\n\
  RAID level                              : RAID1\n";
        let metrics = parse_ir_volume_sect(sect).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, "0");
    }

    #[test]
    fn test_volume_ok_phrase_must_match_whole_state() {
        // Substrings are not good enough; the phrase must be the whole
        // trimmed state text (with the optional Inactive prefix).
        let sect = "\
IR volume 1\n\
  Volume ID                               : 79\n\
  Status of volume                        : Not Okay (OKY) at all\n\
  RAID level                              : RAID1\n";
        let metrics = parse_ir_volume_sect(sect).unwrap();
        assert_eq!(metrics[0].value, "0");
    }

    #[test]
    fn test_empty_volume_section_yields_no_metrics() {
        assert!(parse_ir_volume_sect("").unwrap().is_empty());
    }

    #[test]
    fn test_volume_missing_field_is_structural_error() {
        let sect = "\
IR volume 1\n\
  Volume ID                               : 79\n\
  Status of volume                        : Okay (OKY)\n";
        let err = parse_ir_volume_sect(sect).unwrap_err();
        match err {
            ParseError::MissingFields { record, missing, .. } => {
                assert_eq!(record, "IR volume");
                assert_eq!(missing, vec!["raidlevel"]);
            }
            other => panic!("expected MissingFields, got {other}"),
        }
    }

    #[test]
    fn test_volume_duplicate_field_is_structural_error() {
        let sect = "\
IR volume 1\n\
  Volume ID                               : 79\n\
  Volume ID                               : 80\n\
  Status of volume                        : Okay (OKY)\n\
  RAID level                              : RAID1\n";
        let err = parse_ir_volume_sect(sect).unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateField { attr: "volume_id", .. }
        ));
    }

    const PHYS_SECT: &str = "\
Initiator at ID #0\n\
\n\
Device is a Hard disk\n\
  Enclosure #                             : 1\n\
  Slot #                                  : 0\n\
  SAS Address                             : 4433221-1-0700-0000\n\
  State                                   : Optimal (OPT)\n\
  Size (in MB)/(in sectors)               : 476940/976773167\n\
  Manufacturer                            : ATA     \n\
  Model Number                            : WDC WD5003ABYX-1\n\
  Firmware Revision                       : 1S02\n\
  Serial No                               : WDWMAYP2093279\n\
  Protocol                                : SATA\n\
  Drive Type                              : SATA_HDD\n\
\n\
Device is a Hard disk\n\
  Enclosure #                             : 2\n\
  Slot #                                  : 18\n\
  State                                   : Ready (RDY)\n\
  Model Number                            : ST2000NM0033-9ZM\n\
\n\
Device is a Hard disk\n\
  Enclosure #                             : 2\n\
  Slot #                                  : 19\n\
  State                                   : Standby (SBY)\n\
  Model Number                            : ST32000641ASTrailSpaces    \n\
\n\
Device is a Enclosure services device\n\
  Enclosure #                             : 2\n\
  Slot #                                  : 24\n\
  State                                   : Standby (SBY)\n\
  Model Number                            : SAS2X36         \n";

    #[test]
    fn test_phys_section_classifies_and_skips_non_disks() {
        let metrics = parse_phys_device_sect(PHYS_SECT).unwrap();
        let lines: Vec<String> = metrics.iter().map(Metric::render).collect();
        assert_eq!(
            lines,
            vec![
                r#"sas2ircu_state_ok{device="physical", enclosure="1", model="WDC WD5003ABYX-1", slot="0"} 1"#,
                r#"sas2ircu_state_ok{device="physical", enclosure="2", model="ST2000NM0033-9ZM", slot="18"} 1"#,
                r#"sas2ircu_state_ok{device="physical", enclosure="2", model="ST32000641ASTrailSpaces", slot="19"} 0"#,
            ]
        );
    }

    fn display_dump() -> String {
        let rule = "-".repeat(72);
        format!(
            "\n\
LSI Corporation SAS2 IR Configuration Utility.\n\
Version 16.00.00.00 (2013.03.01)\n\
\n\
Read configuration has been initiated for controller 0\n\
{rule}\n\
Controller information\n\
{rule}\n\
  Controller type                         : SAS2008\n\
  BIOS version                            : 7.11.01.00\n\
  RAID Support                            : Yes\n\
{rule}\n\
IR Volume information\n\
{rule}\n\
IR volume 1\n\
  Volume ID                               : 79\n\
  Status of volume                        : Okay (OKY)\n\
  RAID level                              : RAID1\n\
{rule}\n\
Physical device information\n\
{rule}\n\
Initiator at ID #0\n\
\n\
Device is a Hard disk\n\
  Enclosure #                             : 1\n\
  Slot #                                  : 0\n\
  State                                   : Optimal (OPT)\n\
  Model Number                            : WDC WD5003ABYX-1\n\
{rule}\n\
Enclosure information\n\
{rule}\n\
  Enclosure#                              : 1\n\
  Numslots                                : 8\n\
{rule}\n\
SAS2IRCU: Command DISPLAY Completed Successfully.\n\
SAS2IRCU: Utility Completed Successfully.\n"
        )
    }

    #[test]
    fn test_split_sections_returns_relevant_bodies() {
        let dump = display_dump();
        let sections = split_display_sections(&dump).unwrap();
        assert!(sections.ir_volume.contains("IR volume 1"));
        assert!(sections.physical_device.contains("Device is a Hard disk"));
        assert!(!sections.ir_volume.contains("Controller type"));
    }

    #[test]
    fn test_split_sections_wrong_count_fails() {
        let dump = "preamble\n----------\nController information\n----------\nbody\n";
        let err = split_display_sections(dump).unwrap_err();
        assert!(matches!(err, ParseError::SectionCount { got: 3, .. }));
    }

    #[test]
    fn test_split_sections_misordered_headers_fail() {
        // Enclosure and IR Volume headers swapped.
        let dump = display_dump()
            .replace("IR Volume information", "TEMP")
            .replace("Enclosure information", "IR Volume information")
            .replace("TEMP", "Enclosure information");
        let err = split_display_sections(&dump).unwrap_err();
        assert!(matches!(err, ParseError::SectionMismatch { index: 3, .. }));
    }

    #[test]
    fn test_parse_display_tags_controller_id() {
        let metrics = parse_display("123", &display_dump()).unwrap();
        let lines: Vec<String> = metrics.iter().map(Metric::render).collect();
        assert_eq!(
            lines,
            vec![
                r#"sas2ircu_state_ok{controller_id="123", device="logical", raidlevel="RAID1", volume_id="79", volume_num="1"} 1"#,
                r#"sas2ircu_state_ok{controller_id="123", device="physical", enclosure="1", model="WDC WD5003ABYX-1", slot="0"} 1"#,
            ]
        );
    }

    #[test]
    fn test_probe_output_extracts_leading_integers() {
        let out = "\
LSI Corporation SAS2 IR Configuration Utility.\n\
\n\
         Adapter      Vendor  Device\n\
 Index    Type          ID      ID\n\
 -----   ------------  ------  ------\n\
   0     SAS2008     1000h    72h\n\
   1     SAS2308     1000h    87h\n\
SAS2IRCU: Utility Completed Successfully.\n";
        assert_eq!(parse_probe_output(out), vec!["0", "1"]);
    }
}
