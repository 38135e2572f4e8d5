//! Parser for `mpt-status` output (LSI MPT Fusion RAID controllers).
//!
//! Every interesting line of `mpt-status -n -i <id>` output is a single
//! self-contained record: one line per logical volume, physical disk, or
//! spare. Each device kind has its own whole-line pattern with named capture
//! groups; a line is parsed by trying the kinds in priority order and taking
//! the first match.

use std::sync::LazyLock;

use regex::Regex;

use crate::expand::{expand_flags, expand_state, SymbolUniverse};
use crate::metric::{labels, Metric, MetricDesc};

pub static STATE: MetricDesc = MetricDesc::gauge("mpt_status_state", "device state");
pub static FLAG: MetricDesc = MetricDesc::gauge("mpt_status_flag", "device flags");
pub static DISKS_NUM: MetricDesc =
    MetricDesc::gauge("mpt_status_disks_num", "number of disks in logical volume");
pub static SYNC_PERCENTAGE: MetricDesc =
    MetricDesc::gauge("mpt_status_sync_percentage", "sync status");
pub static SIZE_GIB: MetricDesc =
    MetricDesc::gauge("mpt_status_size_gib", "capacity of device in gibibytes");

pub const VOLUME_STATES: SymbolUniverse = &["OPTIMAL", "DEGRADED", "FAILED", "UNKNOWN"];
pub const VOLUME_FLAGS: SymbolUniverse =
    &["ENABLED", "QUIESCED", "RESYNC_IN_PROGRESS", "VOLUME_INACTIVE"];
pub const DISK_STATES: SymbolUniverse = &[
    "ONLINE",
    "MISSING",
    "NOT_COMPATIBLE",
    "FAILED",
    "INITIALIZING",
    "OFFLINE_REQUESTED",
    "FAILED_REQUESTED",
    "OTHER_OFFLINE",
    "UNKNOWN",
];
pub const DISK_FLAGS: SymbolUniverse = &["OUT_OF_SYNC", "QUIESCED"];

static PATTERNS: LazyLock<LinePatterns> = LazyLock::new(LinePatterns::new);

struct LinePatterns {
    // Whole-line record patterns, one per device kind.
    volume: Regex,
    physical: Regex,
    spare: Regex,
    // `mpt-status -p` identifier lines.
    probe_id: Regex,
    // Resync progress lines, not device records.
    progress: Regex,
}

impl LinePatterns {
    fn new() -> Self {
        // All patterns are compile-time constants; a failure here is a
        // programmer error, not a runtime condition.
        Self {
            // ioc:0 vol_id:0 type:IM raidlevel:RAID-1 num_disks:2 size(GB):135 state: OPTIMAL flags: ENABLED
            volume: Regex::new(
                r"(?i)^\s*ioc:\s*(?P<controller_id>\d+)\s+vol_id:\s*(?P<volume_id>\d+)\s+type:\s*(?P<type>\w+)\s+raidlevel:\s*(?P<raidlevel>[-\w]+)\s+num_disks:\s*(?P<num_disks>\d+)\s+size\(GB\):\s*(?P<size>\d+)\s+state:\s*(?P<state>\w+)\s+flags:(?P<flags>.+)",
            )
            .expect("static regex must compile"),
            // ioc:0 phys_id:1 scsi_id:12 vendor:X product_id:Y revision:Z size(GB):136 state: ONLINE flags: NONE sync_state: 100 ...
            physical: Regex::new(
                r"(?i)^\s*ioc:\s*(?P<controller_id>\d+)\s+phys_id:\s*(?P<phys_id>\d+)\s+scsi_id:\s*(?P<scsi_id>\d+)\s+vendor:\s*(?P<vendor>\S+)\s+product_id:\s*(?P<product_id>\S+)\s+revision:\s*(?P<revision>\S+)\s+size\(GB\):\s*(?P<size>\d+)\s+state:\s*(?P<state>\w+)\s+flags:(?P<flags>.+)\s+sync_state:\s*(?P<sync_state>\d+)",
            )
            .expect("static regex must compile"),
            // Same shape, but spare_id and a literal "n/a" sync state.
            spare: Regex::new(
                r"(?i)^\s*ioc:\s*(?P<controller_id>\d+)\s+spare_id:\s*(?P<spare_id>\d+)\s+scsi_id:\s*(?P<scsi_id>\d+)\s+vendor:\s*(?P<vendor>\S+)\s+product_id:\s*(?P<product_id>\S+)\s+revision:\s*(?P<revision>\S+)\s+size\(GB\):\s*(?P<size>\d+)\s+state:\s*(?P<state>\w+)\s+flags:(?P<flags>.+)\s+sync_state:\s*n/a",
            )
            .expect("static regex must compile"),
            probe_id: Regex::new(r"(?i)found\s+scsi\s+id=\s*(\d+)")
                .expect("static regex must compile"),
            progress: Regex::new(r"(?i)^scsi_id:\d+\s+\d+%").expect("static regex must compile"),
        }
    }
}

/// A parsed logical-volume record.
#[derive(Debug, Clone)]
pub struct VolumeRecord {
    pub controller_id: String,
    pub volume_id: String,
    pub volume_type: String,
    pub raidlevel: String,
    pub num_disks: String,
    pub size_gb: String,
    pub state: String,
    pub flags: Vec<String>,
}

/// A parsed physical-disk record; `sync_percentage` is absent for spares.
#[derive(Debug, Clone)]
pub struct DiskRecord {
    pub controller_id: String,
    pub disk_id: String,
    pub scsi_id: String,
    pub vendor: String,
    pub product_id: String,
    pub revision: String,
    pub size_gb: String,
    pub state: String,
    pub flags: Vec<String>,
    pub sync_percentage: Option<String>,
}

/// One recognized line of `mpt-status` status output.
#[derive(Debug, Clone)]
pub enum DeviceLine {
    Volume(VolumeRecord),
    Physical(DiskRecord),
    Spare(DiskRecord),
}

impl DeviceLine {
    /// Tries each device-kind pattern in priority order. `None` means the
    /// line matches no known record shape.
    pub fn parse(line: &str) -> Option<Self> {
        parse_volume(line)
            .map(DeviceLine::Volume)
            .or_else(|| parse_disk(line, false).map(DeviceLine::Physical))
            .or_else(|| parse_disk(line, true).map(DeviceLine::Spare))
    }

    /// Expands the record into its full set of gauge observations.
    pub fn metrics(&self) -> Vec<Metric> {
        match self {
            DeviceLine::Volume(v) => v.metrics(),
            DeviceLine::Physical(d) => d.metrics("physical"),
            DeviceLine::Spare(d) => d.metrics("spare"),
        }
    }
}

fn split_flags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn parse_volume(line: &str) -> Option<VolumeRecord> {
    let caps = PATTERNS.volume.captures(line)?;
    Some(VolumeRecord {
        controller_id: caps["controller_id"].to_string(),
        volume_id: caps["volume_id"].to_string(),
        volume_type: caps["type"].to_string(),
        raidlevel: caps["raidlevel"].to_string(),
        num_disks: caps["num_disks"].to_string(),
        size_gb: caps["size"].to_string(),
        state: caps["state"].to_string(),
        flags: split_flags(&caps["flags"]),
    })
}

fn parse_disk(line: &str, spare: bool) -> Option<DiskRecord> {
    let (pattern, id_group) = if spare {
        (&PATTERNS.spare, "spare_id")
    } else {
        (&PATTERNS.physical, "phys_id")
    };
    let caps = pattern.captures(line)?;
    let sync_percentage = if spare {
        None
    } else {
        Some(caps["sync_state"].to_string())
    };
    Some(DiskRecord {
        controller_id: caps["controller_id"].to_string(),
        disk_id: caps[id_group].to_string(),
        scsi_id: caps["scsi_id"].to_string(),
        vendor: caps["vendor"].to_string(),
        product_id: caps["product_id"].to_string(),
        revision: caps["revision"].to_string(),
        size_gb: caps["size"].to_string(),
        state: caps["state"].to_string(),
        flags: split_flags(&caps["flags"]),
        sync_percentage,
    })
}

impl VolumeRecord {
    fn metrics(&self) -> Vec<Metric> {
        let base = labels(&[
            ("controller_id", &self.controller_id),
            ("device", "logical"),
            ("id", &self.volume_id),
            ("type", &self.volume_type),
            ("raidlevel", &self.raidlevel),
        ]);

        let mut metrics = expand_state(&STATE, &base, VOLUME_STATES, &self.state);
        metrics.extend(expand_flags(&FLAG, &base, VOLUME_FLAGS, &self.flags));
        metrics.push(Metric::new(&SIZE_GIB, base.clone(), self.size_gb.clone()));
        metrics.push(Metric::new(&DISKS_NUM, base, self.num_disks.clone()));
        metrics
    }
}

impl DiskRecord {
    fn metrics(&self, device: &str) -> Vec<Metric> {
        let base = labels(&[
            ("controller_id", &self.controller_id),
            ("device", device),
            ("id", &self.disk_id),
            ("scsi_id", &self.scsi_id),
            ("vendor", &self.vendor),
            ("product_id", &self.product_id),
            ("revision", &self.revision),
        ]);

        let mut metrics = expand_state(&STATE, &base, DISK_STATES, &self.state);
        metrics.extend(expand_flags(&FLAG, &base, DISK_FLAGS, &self.flags));
        if let Some(sync) = &self.sync_percentage {
            metrics.push(Metric::new(&SYNC_PERCENTAGE, base.clone(), sync.clone()));
        }
        metrics.push(Metric::new(&SIZE_GIB, base, self.size_gb.clone()));
        metrics
    }
}

/// Extracts device identifiers from `mpt-status -p` output.
pub fn parse_probe_output(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| PATTERNS.probe_id.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Resync progress lines (`scsi_id:0 100%`) interleave with device records
/// and are skipped before record matching.
pub fn is_progress_line(line: &str) -> bool {
    PATTERNS.progress.is_match(line)
}
