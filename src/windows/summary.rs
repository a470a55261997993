//! Per-class channel statistics over extracted windows

use crate::telemetry::WindowClass;
use crate::windows::Window;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean and sample standard deviation of one channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator), 0 for a single value
    pub std_dev: f64,
    pub count: usize,
}

impl ChannelStats {
    /// Statistics over a slice of readings, `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };
        Some(Self {
            mean,
            std_dev,
            count,
        })
    }
}

/// Channel statistics for the anomalous and normal window classes
///
/// Each class is summarised over the concatenation of all of its windows' rows.
/// The channel used to trigger event selection is never summarised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassSummary {
    pub anomalous: BTreeMap<String, ChannelStats>,
    pub normal: BTreeMap<String, ChannelStats>,
}

impl ClassSummary {
    /// Summarise both classes over `channels`, skipping `excluded`
    pub fn compute(
        anomalous: &[Window],
        normal: &[Window],
        channels: &[String],
        excluded: &[String],
    ) -> Self {
        let summarised: Vec<&String> = channels
            .iter()
            .filter(|c| !excluded.contains(c))
            .collect();

        Self {
            anomalous: Self::class_stats(anomalous, &summarised),
            normal: Self::class_stats(normal, &summarised),
        }
    }

    fn class_stats(windows: &[Window], channels: &[&String]) -> BTreeMap<String, ChannelStats> {
        channels
            .iter()
            .filter_map(|&channel| {
                let values: Vec<f64> = windows
                    .iter()
                    .flat_map(|w| w.samples.iter())
                    .filter_map(|s| s.value(channel))
                    .collect();
                ChannelStats::from_values(&values).map(|stats| (channel.clone(), stats))
            })
            .collect()
    }

    /// Statistics for one class
    pub fn class(&self, class: WindowClass) -> &BTreeMap<String, ChannelStats> {
        match class {
            WindowClass::Anomalous => &self.anomalous,
            WindowClass::Normal => &self.normal,
        }
    }

    /// True if either class carries statistics for the channel
    pub fn contains_channel(&self, channel: &str) -> bool {
        self.anomalous.contains_key(channel) || self.normal.contains_key(channel)
    }

    /// Flatten into a single record of named values
    ///
    /// Keys look like `mean_anomalous_<channel>` / `std_normal_<channel>`.
    /// Channels present in one class only are reported as NaN for the other.
    pub fn to_record(&self) -> Vec<(String, f64)> {
        let mut channels: Vec<&String> = self.anomalous.keys().chain(self.normal.keys()).collect();
        channels.sort();
        channels.dedup();
        self.to_record_for(&channels)
    }

    /// Flatten over a fixed channel list
    ///
    /// Rows from different summaries line up column by column; channels with
    /// no statistics in a class come out as NaN.
    pub fn to_record_for<S: AsRef<str>>(&self, channels: &[S]) -> Vec<(String, f64)> {
        let mut record = Vec::with_capacity(channels.len() * 4);
        for class in [WindowClass::Anomalous, WindowClass::Normal] {
            let stats = self.class(class);
            for channel in channels {
                let channel = channel.as_ref();
                let entry = stats.get(channel);
                record.push((
                    format!("mean_{}_{}", class.as_str(), channel),
                    entry.map_or(f64::NAN, |s| s.mean),
                ));
                record.push((
                    format!("std_{}_{}", class.as_str(), channel),
                    entry.map_or(f64::NAN, |s| s.std_dev),
                ));
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Sample;
    use chrono::{TimeZone, Utc};

    fn window(class: WindowClass, rows: &[(f64, f64)]) -> Window {
        let samples = rows
            .iter()
            .enumerate()
            .map(|(i, (pf, thd))| {
                Sample::new(
                    Utc.timestamp_opt(i as i64 * 10, 0).unwrap(),
                    [("PowA_L1_Ins", 1.0), ("PowF_T_Ins", *pf), ("THDI_L1_Ins", *thd)],
                )
            })
            .collect();
        Window {
            class,
            end_index: rows.len() - 1,
            samples,
        }
    }

    fn channels() -> Vec<String> {
        vec![
            "PowA_L1_Ins".to_string(),
            "PowF_T_Ins".to_string(),
            "THDI_L1_Ins".to_string(),
        ]
    }

    #[test]
    fn test_channel_stats_sample_std() {
        let stats = ChannelStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // Sample variance is 32 / 7
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn test_channel_stats_edge_cases() {
        assert!(ChannelStats::from_values(&[]).is_none());
        let single = ChannelStats::from_values(&[3.5]).unwrap();
        assert_eq!(single.mean, 3.5);
        assert_eq!(single.std_dev, 0.0);
    }

    #[test]
    fn test_summary_concatenates_windows_per_class() {
        let anomalous = vec![
            window(WindowClass::Anomalous, &[(0.8, 10.0), (0.8, 10.0)]),
            window(WindowClass::Anomalous, &[(0.6, 20.0), (0.6, 20.0)]),
        ];
        let normal = vec![window(WindowClass::Normal, &[(0.95, 2.0), (0.95, 2.0)])];

        let summary = ClassSummary::compute(
            &anomalous,
            &normal,
            &channels(),
            &["PowA_L1_Ins".to_string()],
        );

        let pf = summary.anomalous["PowF_T_Ins"];
        assert!((pf.mean - 0.7).abs() < 1e-12);
        assert_eq!(pf.count, 4);
        assert_eq!(summary.normal["THDI_L1_Ins"].mean, 2.0);
        assert_eq!(summary.normal["THDI_L1_Ins"].std_dev, 0.0);
    }

    #[test]
    fn test_summary_excludes_trigger_channel() {
        let anomalous = vec![window(WindowClass::Anomalous, &[(0.8, 10.0)])];
        let summary =
            ClassSummary::compute(&anomalous, &[], &channels(), &["PowA_L1_Ins".to_string()]);

        assert!(!summary.contains_channel("PowA_L1_Ins"));
        assert!(summary
            .to_record()
            .iter()
            .all(|(name, _)| !name.contains("PowA_L1_Ins")));
    }

    #[test]
    fn test_record_layout() {
        let anomalous = vec![window(WindowClass::Anomalous, &[(0.8, 10.0)])];
        let summary = ClassSummary::compute(
            &anomalous,
            &[],
            &["PowF_T_Ins".to_string()],
            &[],
        );

        let record = summary.to_record();
        let names: Vec<&str> = record.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "mean_anomalous_PowF_T_Ins",
                "std_anomalous_PowF_T_Ins",
                "mean_normal_PowF_T_Ins",
                "std_normal_PowF_T_Ins",
            ]
        );
        assert_eq!(record[0].1, 0.8);
        assert!(record[2].1.is_nan());
    }

    #[test]
    fn test_record_for_fixed_channels() {
        let summary = ClassSummary::default();
        let record = summary.to_record_for(&["THDI_L1_Ins"]);
        assert_eq!(record.len(), 4);
        assert_eq!(record[1].0, "std_anomalous_THDI_L1_Ins");
        assert!(record.iter().all(|(_, v)| v.is_nan()));
    }
}
