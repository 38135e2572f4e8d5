//! raid-exporter - Prometheus exporters for LSI RAID controller utilities.
//!
//! This library provides the parsing core shared between:
//! - `mpt-status-exporter` - wraps `mpt-status` (MPT Fusion controllers)
//! - `sas2ircu-exporter` - wraps `sas2ircu` (SAS2 controllers)
//!
//! Both pipelines probe for device identifiers, fetch per-device status text,
//! extract typed records from it, and expose the result in the Prometheus
//! text format.

pub mod exec;
pub mod expand;
pub mod metric;
pub mod mpt;
pub mod sas2ircu;
pub mod split;
