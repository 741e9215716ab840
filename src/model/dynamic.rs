/*!
A dynamic meta-network: a time-ordered series of meta-network slices.

Slice timestamps live in the `id` attribute of each `<MetaNetwork>` element using
`SLICE_ID_FORMAT`. They are only parsed when an operation needs them.
*/

use std::{collections::BTreeMap, fmt::Display};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::meta_network::MetaNetwork;

pub const SLICE_ID_FORMAT: &str = "%Y%m%dT%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SliceError {
    #[error("Meta-network slice {0} has no id attribute")]
    MissingId(usize),
    #[error("Meta-network id '{0}' is not a timestamp in {SLICE_ID_FORMAT} form")]
    InvalidTimestamp(String),
}

/// Root element name of a dynamic document. ORA writes `DynamicNetwork`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicRoot {
    #[default]
    DynamicMetaNetwork,
    DynamicNetwork,
}

impl DynamicRoot {
    pub const fn tag(self) -> &'static str {
        match self {
            DynamicRoot::DynamicMetaNetwork => "DynamicMetaNetwork",
            DynamicRoot::DynamicNetwork => "DynamicNetwork",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicMetaNetwork {
    #[serde(default)]
    pub root: DynamicRoot,
    pub attributes: BTreeMap<String, String>,
    pub metanetworks: Vec<MetaNetwork>,
}

pub fn parse_slice_id(id: &str) -> Result<NaiveDateTime, SliceError> {
    NaiveDateTime::parse_from_str(id, SLICE_ID_FORMAT)
        .map_err(|_| SliceError::InvalidTimestamp(id.to_string()))
}

impl DynamicMetaNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.metanetworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metanetworks.is_empty()
    }

    pub fn slice_timestamp(&self, index: usize) -> Result<NaiveDateTime, SliceError> {
        let id = self
            .metanetworks
            .get(index)
            .and_then(MetaNetwork::id)
            .ok_or(SliceError::MissingId(index))?;
        parse_slice_id(id)
    }

    /// Drops slices stamped strictly before `start`.
    pub fn drop_before(&mut self, start: NaiveDateTime) -> Result<usize, SliceError> {
        self.retain_by_time(|ts| ts >= start)
    }

    /// Drops slices stamped strictly after `end`.
    pub fn drop_after(&mut self, end: NaiveDateTime) -> Result<usize, SliceError> {
        self.retain_by_time(|ts| ts <= end)
    }

    /// With `keep_in_range`, keeps only slices inside at least one inclusive range;
    /// otherwise drops every slice inside any range. Returns the number of slices dropped.
    pub fn retain_ranges(
        &mut self,
        ranges: &[(NaiveDateTime, NaiveDateTime)],
        keep_in_range: bool,
    ) -> Result<usize, SliceError> {
        self.retain_by_time(|ts| {
            let inside = ranges.iter().any(|(start, end)| *start <= ts && ts <= *end);
            inside == keep_in_range
        })
    }

    // Timestamps are resolved up front so a bad id leaves the series untouched.
    fn retain_by_time<F>(&mut self, keep: F) -> Result<usize, SliceError>
    where
        F: Fn(NaiveDateTime) -> bool,
    {
        let stamps = (0..self.metanetworks.len())
            .map(|i| self.slice_timestamp(i))
            .collect::<Result<Vec<_>, _>>()?;
        let before = self.metanetworks.len();
        let mut stamps = stamps.into_iter();
        self.metanetworks
            .retain(|_| stamps.next().map(&keep).unwrap_or(false));
        Ok(before - self.metanetworks.len())
    }
}

impl Display for DynamicMetaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " == {} ==", self.root.tag())?;
        for (key, value) in &self.attributes {
            writeln!(f, "  {key}: {value}")?;
        }
        writeln!(f, "  {} meta-networks", self.metanetworks.len())?;
        for (index, mn) in self.metanetworks.iter().enumerate() {
            writeln!(f, "\n --- Slice {index} ---")?;
            write!(f, "{mn}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> DynamicMetaNetwork {
        let mut dmn = DynamicMetaNetwork::new();
        for id in ["20140224T21:00:00", "20140224T22:00:00", "20140224T23:00:00"] {
            dmn.metanetworks.push(MetaNetwork::with_id(id));
        }
        dmn
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_slice_id(s).unwrap()
    }

    #[test]
    fn test_drop_before_and_after() {
        let mut dmn = series();
        assert_eq!(dmn.drop_before(ts("20140224T22:00:00")).unwrap(), 1);
        assert_eq!(dmn.drop_after(ts("20140224T22:30:00")).unwrap(), 1);
        assert_eq!(dmn.len(), 1);
        assert_eq!(dmn.metanetworks[0].id(), Some("20140224T22:00:00"));
    }

    #[test]
    fn test_retain_ranges() {
        let range = [(ts("20140224T21:30:00"), ts("20140224T23:00:00"))];

        let mut keep = series();
        assert_eq!(keep.retain_ranges(&range, true).unwrap(), 1);
        assert_eq!(keep.len(), 2);

        let mut drop = series();
        assert_eq!(drop.retain_ranges(&range, false).unwrap(), 2);
        assert_eq!(drop.metanetworks[0].id(), Some("20140224T21:00:00"));
    }

    #[test]
    fn test_display_lists_header_and_slices() {
        let mut dmn = series();
        dmn.root = DynamicRoot::DynamicNetwork;
        dmn.attributes.insert("id".into(), "hourly".into());
        let text = dmn.to_string();
        assert!(text.starts_with(" == DynamicNetwork =="));
        assert!(text.contains("  id: hourly"));
        assert!(text.contains("  3 meta-networks"));
        assert!(text.contains(" --- Slice 2 ---"));
        assert!(text.contains("  id: 20140224T23:00:00"));
    }

    #[test]
    fn test_bad_slice_id_leaves_series_untouched() {
        let mut dmn = series();
        dmn.metanetworks.push(MetaNetwork::with_id("2014-02-24 11 PM"));
        let err = dmn.drop_before(ts("20140224T22:00:00")).unwrap_err();
        assert_eq!(err, SliceError::InvalidTimestamp("2014-02-24 11 PM".into()));
        assert_eq!(dmn.len(), 4);
    }
}
