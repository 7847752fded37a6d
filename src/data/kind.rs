//! Data kinds: the domain meaning of a record and its kind-specific metadata.
//!
//! [`KindTag`] names a kind at registration time, [`KindParams`] carries the
//! optional parameters a caller supplies, and [`DataKind`] is the validated,
//! fully-populated result stored on the record.

use crate::data::codec::{SampleType, Samples};
use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind names accepted by `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    /// Paths to files, stored as text. RAM only.
    FilePaths,
    /// Paths to folders, stored as text. RAM only.
    FolderPaths,
    /// A list of file names. RAM only.
    FileList,
    /// A time-domain signal.
    TemporalSignal,
    /// A spectrum.
    FreqSignal,
    /// A set of spectra referenced by id.
    FftCollection,
    /// Plain numeric constants.
    Constants,
    /// A single string.
    Text,
    /// Plain integers.
    Integers,
    /// A frequency limit envelope.
    FreqLimits,
    /// A time-domain limit envelope.
    TempLimits,
}

impl KindTag {
    /// Sample type used when the caller does not override it.
    #[must_use]
    pub fn default_sample_type(self) -> SampleType {
        match self {
            KindTag::FilePaths
            | KindTag::FolderPaths
            | KindTag::FileList
            | KindTag::FftCollection
            | KindTag::Text => SampleType::Text,
            KindTag::TemporalSignal | KindTag::FreqSignal | KindTag::Constants => {
                SampleType::Float32
            }
            KindTag::Integers => SampleType::Int32,
            KindTag::FreqLimits | KindTag::TempLimits => SampleType::Float64,
        }
    }

    /// Resolve the sample type for a record of this kind.
    ///
    /// Float kinds may widen to `Float64` and `Integers` to `Int64`; any other
    /// override is rejected.
    pub fn resolve_sample_type(self, requested: Option<SampleType>) -> PoolResult<SampleType> {
        let default = self.default_sample_type();
        let Some(requested) = requested else {
            return Ok(default);
        };
        let allowed = requested == default
            || matches!(
                (self, requested),
                (
                    KindTag::TemporalSignal | KindTag::FreqSignal | KindTag::Constants,
                    SampleType::Float64
                ) | (KindTag::Integers, SampleType::Int64)
            );
        if allowed {
            Ok(requested)
        } else {
            Err(PoolError::InvalidConfiguration(format!(
                "{self} records cannot use sample type {requested}"
            )))
        }
    }

    /// Path-list kinds only live in memory.
    #[must_use]
    pub fn is_ram_only(self) -> bool {
        matches!(
            self,
            KindTag::FilePaths | KindTag::FolderPaths | KindTag::FileList
        )
    }

    /// Kinds whose payload is checked as a whole (metadata parsing, or the
    /// single-string rule for text), so chunked stores are gathered first.
    #[must_use]
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            KindTag::FftCollection | KindTag::FreqLimits | KindTag::TempLimits | KindTag::Text
        )
    }

    /// Snake-case name, as accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::FilePaths => "file_paths",
            KindTag::FolderPaths => "folder_paths",
            KindTag::FileList => "file_list",
            KindTag::TemporalSignal => "temporal_signal",
            KindTag::FreqSignal => "freq_signal",
            KindTag::FftCollection => "fft_collection",
            KindTag::Constants => "constants",
            KindTag::Text => "text",
            KindTag::Integers => "integers",
            KindTag::FreqLimits => "freq_limits",
            KindTag::TempLimits => "temp_limits",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional parameters supplied with `register`.
///
/// Which fields are required depends on the kind; see [`DataKind::from_params`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindParams {
    /// Seconds between samples of a temporal signal.
    pub time_step: Option<f64>,
    /// Hz between bins of a spectrum.
    pub freq_step: Option<f64>,
    /// Physical unit of the values.
    pub unit: Option<String>,
    /// Time of the first sample, default 0.
    pub t_min: Option<f64>,
    /// Frequency of the first bin, default 0.
    pub f_min: Option<f64>,
    /// Acquisition time of a spectrum, default 0.
    pub timestamp: Option<f64>,
    /// Initial mode of a frequency limit envelope.
    pub interpolation_mode: Option<InterpolationMode>,
    /// Override of the kind's default sample type.
    pub sample_type: Option<SampleType>,
}

impl KindParams {
    /// Parameters for a temporal signal.
    pub fn temporal(time_step: f64, unit: impl Into<String>) -> Self {
        Self {
            time_step: Some(time_step),
            unit: Some(unit.into()),
            ..Self::default()
        }
    }

    /// Parameters for a frequency signal or FFT collection.
    pub fn frequency(freq_step: f64, unit: impl Into<String>) -> Self {
        Self {
            freq_step: Some(freq_step),
            unit: Some(unit.into()),
            ..Self::default()
        }
    }

    /// Set `unit`.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set `t_min`.
    pub fn with_t_min(mut self, t_min: f64) -> Self {
        self.t_min = Some(t_min);
        self
    }

    /// Set `f_min`.
    pub fn with_f_min(mut self, f_min: f64) -> Self {
        self.f_min = Some(f_min);
        self
    }

    /// Set `timestamp`.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the interpolation mode of a limit envelope.
    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation_mode = Some(mode);
        self
    }

    /// Override the sample type (see [`KindTag::resolve_sample_type`]).
    pub fn with_sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = Some(sample_type);
        self
    }
}

fn required<T: Clone>(value: &Option<T>, kind: KindTag, field: &str) -> PoolResult<T> {
    value
        .clone()
        .ok_or_else(|| PoolError::InvalidConfiguration(format!("{kind} requires {field}")))
}

fn positive_step(value: f64, field: &str) -> PoolResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PoolError::InvalidConfiguration(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

/// A time-domain signal sampled every `time_step` seconds from `t_min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalSignal {
    /// Seconds between samples.
    pub time_step: f64,
    /// Physical unit.
    pub unit: String,
    /// Time of the first sample.
    pub t_min: f64,
}

impl TemporalSignal {
    /// Samples per second.
    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        1.0 / self.time_step
    }

    /// Set the time step from a sampling rate in Hz.
    pub fn set_sampling_rate(&mut self, rate: f64) -> PoolResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PoolError::Domain(format!(
                "sampling rate must be positive, got {rate}"
            )));
        }
        self.time_step = 1.0 / rate;
        Ok(())
    }
}

/// A spectrum sampled every `freq_step` from `f_min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqSignal {
    /// Hz between bins.
    pub freq_step: f64,
    /// Physical unit.
    pub unit: String,
    /// Frequency of the first bin.
    pub f_min: f64,
    /// Acquisition time.
    pub timestamp: f64,
}

/// Identifiers of the `FreqSignal` records making up a set of spectra.
///
/// Members are resolved through the pool when read; the collection never
/// owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FftCollection {
    /// Hz between bins, shared by every member.
    pub freq_step: f64,
    /// Frequency of the first bin.
    pub f_min: f64,
    /// Physical unit.
    pub unit: String,
    /// Member record ids, in stored order.
    pub member_ids: Vec<String>,
}

/// How [`FreqLimits::interpolate`] blends between points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Straight line between neighbouring points.
    Linear,
    /// Linear in the logarithm of the frequency.
    Log,
}

impl FromStr for InterpolationMode {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(InterpolationMode::Linear),
            "log" => Ok(InterpolationMode::Log),
            other => Err(PoolError::InvalidConfiguration(format!(
                "Interpolation mode must be 'linear' or 'log', got '{other}'"
            ))),
        }
    }
}

/// A frequency-domain limit envelope made of `(frequency, level)` points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreqLimits {
    /// Unit of the levels.
    pub unit: String,
    interpolation_mode: Option<InterpolationMode>,
    points: Vec<(f64, f64)>,
}

impl FreqLimits {
    /// An empty envelope with no interpolation mode.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    /// Current mode, `None` until one is set.
    #[must_use]
    pub fn interpolation_mode(&self) -> Option<InterpolationMode> {
        self.interpolation_mode
    }

    /// Change the mode; points are kept.
    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolation_mode = Some(mode);
    }

    /// `(frequency, level)` points in increasing frequency.
    #[must_use]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Append a point. Frequencies must be strictly increasing.
    pub fn add_point(&mut self, frequency: f64, level: f64) -> PoolResult<()> {
        if !frequency.is_finite() || !level.is_finite() {
            return Err(PoolError::Domain(format!(
                "limit point ({frequency}, {level}) is not finite"
            )));
        }
        if let Some(&(last, _)) = self.points.last() {
            if frequency <= last {
                return Err(PoolError::Domain(format!(
                    "frequency {frequency} does not follow {last}; points must be strictly increasing"
                )));
            }
        }
        self.points.push((frequency, level));
        Ok(())
    }

    /// Remove every point.
    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    /// Lowest frequency, if any point exists.
    #[must_use]
    pub fn freq_min(&self) -> Option<f64> {
        self.points.first().map(|&(f, _)| f)
    }

    /// Highest frequency, if any point exists.
    #[must_use]
    pub fn freq_max(&self) -> Option<f64> {
        self.points.last().map(|&(f, _)| f)
    }

    /// Limit level at `frequency`.
    ///
    /// Outside the envelope the nearest endpoint's level is returned.
    ///
    /// # Errors
    ///
    /// `Domain` with no points, for a NaN or infinite `frequency`, or in log
    /// mode when a bracketing frequency is not strictly positive.
    /// `InvalidConfiguration` if no mode was set.
    pub fn interpolate(&self, frequency: f64) -> PoolResult<f64> {
        if !frequency.is_finite() {
            return Err(PoolError::Domain(format!(
                "cannot interpolate at frequency {frequency}"
            )));
        }
        let (Some(&(first_f, first_l)), Some(&(last_f, last_l))) =
            (self.points.first(), self.points.last())
        else {
            return Err(PoolError::Domain("no frequency limit points have been added".into()));
        };
        let Some(mode) = self.interpolation_mode else {
            return Err(PoolError::InvalidConfiguration(
                "interpolation mode is not set".into(),
            ));
        };
        if frequency <= first_f {
            return Ok(first_l);
        }
        if frequency >= last_f {
            return Ok(last_l);
        }

        let upper = self.points.partition_point(|&(f, _)| f < frequency);
        let (f0, l0) = self.points[upper - 1];
        let (f1, l1) = self.points[upper];
        match mode {
            InterpolationMode::Linear => Ok(l0 + (l1 - l0) * (frequency - f0) / (f1 - f0)),
            InterpolationMode::Log => {
                if f0 <= 0.0 || f1 <= 0.0 {
                    return Err(PoolError::Domain(format!(
                        "log interpolation needs positive frequencies, bracket is [{f0}, {f1}]"
                    )));
                }
                Ok(l0 + (l1 - l0) * (frequency / f0).ln() / (f1 / f0).ln())
            }
        }
    }

    /// Points flattened as `f0, l0, f1, l1, ...`.
    #[must_use]
    pub fn to_samples(&self) -> Samples {
        Samples::Float64(self.points.iter().flat_map(|&(f, l)| [f, l]).collect())
    }

    fn parse_points(&self, samples: &Samples) -> PoolResult<Self> {
        let values = float_payload(samples)?;
        if values.len() % 2 != 0 {
            return Err(PoolError::Format(format!(
                "frequency limits need (frequency, level) pairs, got {} values",
                values.len()
            )));
        }
        let mut parsed = Self {
            unit: self.unit.clone(),
            interpolation_mode: self.interpolation_mode,
            points: Vec::with_capacity(values.len() / 2),
        };
        for pair in values.chunks_exact(2) {
            parsed.add_point(pair[0], pair[1])?;
        }
        Ok(parsed)
    }
}

/// One temporal limit: `level` applies from `transparency` until `release`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempLimitPoint {
    /// Limit level.
    pub level: f64,
    /// Time the limit starts to apply.
    pub transparency: f64,
    /// Time the limit stops applying.
    pub release: f64,
}

/// A time-domain limit envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempLimits {
    /// Unit of the levels.
    pub unit: String,
    points: Vec<TempLimitPoint>,
}

impl TempLimits {
    /// An empty envelope.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            points: Vec::new(),
        }
    }

    /// Points in increasing transparency time.
    #[must_use]
    pub fn points(&self) -> &[TempLimitPoint] {
        &self.points
    }

    /// Append a point. Transparency times must be strictly increasing.
    pub fn add_point(&mut self, level: f64, transparency: f64, release: f64) -> PoolResult<()> {
        if let Some(last) = self.points.last() {
            if transparency <= last.transparency {
                return Err(PoolError::Domain(format!(
                    "transparency time {transparency} does not follow {}",
                    last.transparency
                )));
            }
        }
        self.points.push(TempLimitPoint {
            level,
            transparency,
            release,
        });
        Ok(())
    }

    /// Remove every point.
    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    /// Earliest transparency time.
    #[must_use]
    pub fn time_min(&self) -> Option<f64> {
        self.points.first().map(|p| p.transparency)
    }

    /// Latest release time.
    #[must_use]
    pub fn time_max(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.release)
            .fold(None, |max, r| Some(max.map_or(r, |m: f64| m.max(r))))
    }

    /// Points lying entirely inside `[start, end]`, in insertion order.
    pub fn get_limits_in_range(&self, start: f64, end: f64) -> PoolResult<Vec<TempLimitPoint>> {
        if start > end {
            return Err(PoolError::Domain(format!(
                "start time {start} is after end time {end}"
            )));
        }
        Ok(self
            .points
            .iter()
            .filter(|p| p.transparency >= start && p.release <= end)
            .copied()
            .collect())
    }

    /// Points flattened as `level, transparency, release, ...`.
    #[must_use]
    pub fn to_samples(&self) -> Samples {
        Samples::Float64(
            self.points
                .iter()
                .flat_map(|p| [p.level, p.transparency, p.release])
                .collect(),
        )
    }

    fn parse_points(&self, samples: &Samples) -> PoolResult<Self> {
        let values = float_payload(samples)?;
        if values.len() % 3 != 0 {
            return Err(PoolError::Format(format!(
                "temporal limits need (level, transparency, release) triples, got {} values",
                values.len()
            )));
        }
        let mut parsed = Self::new(self.unit.clone());
        for triple in values.chunks_exact(3) {
            parsed.add_point(triple[0], triple[1], triple[2])?;
        }
        Ok(parsed)
    }
}

fn float_payload(samples: &Samples) -> PoolResult<&[f64]> {
    samples.as_f64().ok_or(PoolError::SampleTypeMismatch {
        expected: SampleType::Float64,
        found: samples.sample_type(),
    })
}

/// The validated kind of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataKind {
    /// File paths.
    FilePaths,
    /// Folder paths.
    FolderPaths,
    /// File names.
    FileList,
    /// A time-domain signal and its time axis.
    TemporalSignal(TemporalSignal),
    /// A spectrum and its frequency axis.
    FreqSignal(FreqSignal),
    /// Spectra referenced by id.
    FftCollection(FftCollection),
    /// Numeric constants.
    Constants,
    /// One string.
    Text,
    /// Integers.
    Integers,
    /// A frequency envelope; its points are the stored payload.
    FreqLimits(FreqLimits),
    /// A time-domain envelope; its points are the stored payload.
    TempLimits(TempLimits),
}

impl DataKind {
    /// Build a kind from registration parameters.
    ///
    /// `TemporalSignal` needs `time_step` and `unit`; `FreqSignal` and
    /// `FftCollection` need `freq_step` and `unit`. Steps must be positive.
    pub fn from_params(tag: KindTag, params: &KindParams) -> PoolResult<Self> {
        let kind = match tag {
            KindTag::FilePaths => DataKind::FilePaths,
            KindTag::FolderPaths => DataKind::FolderPaths,
            KindTag::FileList => DataKind::FileList,
            KindTag::Constants => DataKind::Constants,
            KindTag::Text => DataKind::Text,
            KindTag::Integers => DataKind::Integers,
            KindTag::TemporalSignal => DataKind::TemporalSignal(TemporalSignal {
                time_step: positive_step(required(&params.time_step, tag, "time_step")?, "time_step")?,
                unit: required(&params.unit, tag, "unit")?,
                t_min: params.t_min.unwrap_or(0.0),
            }),
            KindTag::FreqSignal => DataKind::FreqSignal(FreqSignal {
                freq_step: positive_step(required(&params.freq_step, tag, "freq_step")?, "freq_step")?,
                unit: required(&params.unit, tag, "unit")?,
                f_min: params.f_min.unwrap_or(0.0),
                timestamp: params.timestamp.unwrap_or(0.0),
            }),
            KindTag::FftCollection => DataKind::FftCollection(FftCollection {
                freq_step: positive_step(required(&params.freq_step, tag, "freq_step")?, "freq_step")?,
                f_min: params.f_min.unwrap_or(0.0),
                unit: required(&params.unit, tag, "unit")?,
                member_ids: Vec::new(),
            }),
            KindTag::FreqLimits => {
                let mut limits = FreqLimits::new(params.unit.clone().unwrap_or_default());
                limits.interpolation_mode = params.interpolation_mode;
                DataKind::FreqLimits(limits)
            }
            KindTag::TempLimits => {
                DataKind::TempLimits(TempLimits::new(params.unit.clone().unwrap_or_default()))
            }
        };
        Ok(kind)
    }

    /// Name of this kind.
    #[must_use]
    pub fn tag(&self) -> KindTag {
        match self {
            DataKind::FilePaths => KindTag::FilePaths,
            DataKind::FolderPaths => KindTag::FolderPaths,
            DataKind::FileList => KindTag::FileList,
            DataKind::TemporalSignal(_) => KindTag::TemporalSignal,
            DataKind::FreqSignal(_) => KindTag::FreqSignal,
            DataKind::FftCollection(_) => KindTag::FftCollection,
            DataKind::Constants => KindTag::Constants,
            DataKind::Text => KindTag::Text,
            DataKind::Integers => KindTag::Integers,
            DataKind::FreqLimits(_) => KindTag::FreqLimits,
            DataKind::TempLimits(_) => KindTag::TempLimits,
        }
    }

    /// Kind metadata after storing `payload`, or `None` when the payload does
    /// not carry kind content.
    ///
    /// A text record holds exactly one string; any other length is a
    /// `Format` error.
    ///
    /// Nothing is modified; the caller swaps the result in once the payload
    /// has been written.
    pub fn parse_payload(&self, payload: &Samples) -> PoolResult<Option<DataKind>> {
        let parsed = match self {
            DataKind::FreqLimits(limits) => DataKind::FreqLimits(limits.parse_points(payload)?),
            DataKind::TempLimits(limits) => DataKind::TempLimits(limits.parse_points(payload)?),
            DataKind::FftCollection(collection) => {
                let ids = payload.as_text().ok_or(PoolError::SampleTypeMismatch {
                    expected: SampleType::Text,
                    found: payload.sample_type(),
                })?;
                DataKind::FftCollection(FftCollection {
                    member_ids: ids.to_vec(),
                    ..collection.clone()
                })
            }
            DataKind::Text => {
                if payload.len() != 1 {
                    return Err(PoolError::Format(format!(
                        "a text record holds exactly one string, got {}",
                        payload.len()
                    )));
                }
                return Ok(None);
            }
            DataKind::FilePaths
            | DataKind::FolderPaths
            | DataKind::FileList
            | DataKind::TemporalSignal(_)
            | DataKind::FreqSignal(_)
            | DataKind::Constants
            | DataKind::Integers => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// The stored form of kind content, for kinds whose metadata is their data.
    #[must_use]
    pub fn content_samples(&self) -> Option<Samples> {
        match self {
            DataKind::FreqLimits(limits) => Some(limits.to_samples()),
            DataKind::TempLimits(limits) => Some(limits.to_samples()),
            DataKind::FftCollection(collection) => {
                Some(Samples::Text(collection.member_ids.clone()))
            }
            _ => None,
        }
    }

    /// Member identifiers of an FFT collection, empty for other kinds.
    #[must_use]
    pub fn member_ids(&self) -> &[String] {
        match self {
            DataKind::FftCollection(collection) => &collection.member_ids,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(mode: InterpolationMode) -> FreqLimits {
        let mut limits = FreqLimits::new("dB");
        limits.add_point(10.0, -20.0).unwrap();
        limits.add_point(20.0, -10.0).unwrap();
        limits.add_point(40.0, -5.0).unwrap();
        limits.set_interpolation_mode(mode);
        limits
    }

    #[test]
    fn linear_interpolation_between_points() {
        let limits = envelope(InterpolationMode::Linear);
        assert_eq!(limits.interpolate(15.0).unwrap(), -15.0);
        assert_eq!(limits.interpolate(30.0).unwrap(), -7.5);
        assert_eq!(limits.interpolate(20.0).unwrap(), -10.0);
    }

    #[test]
    fn interpolation_clamps_outside_envelope() {
        let limits = envelope(InterpolationMode::Linear);
        assert_eq!(limits.interpolate(1.0).unwrap(), -20.0);
        assert_eq!(limits.interpolate(1000.0).unwrap(), -5.0);
        assert_eq!(limits.freq_min(), Some(10.0));
        assert_eq!(limits.freq_max(), Some(40.0));
    }

    #[test]
    fn log_interpolation_uses_frequency_ratio() {
        let limits = envelope(InterpolationMode::Log);
        let expected = -20.0 + 10.0 * (15.0f64 / 10.0).ln() / 2.0f64.ln();
        assert!((limits.interpolate(15.0).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn log_interpolation_rejects_non_positive_bracket() {
        let mut limits = FreqLimits::new("dB");
        limits.add_point(-10.0, 0.0).unwrap();
        limits.add_point(10.0, 1.0).unwrap();
        limits.set_interpolation_mode(InterpolationMode::Log);
        assert!(matches!(limits.interpolate(5.0), Err(PoolError::Domain(_))));
    }

    #[test]
    fn interpolation_requires_points_and_mode() {
        let mut limits = FreqLimits::new("dB");
        assert!(matches!(limits.interpolate(1.0), Err(PoolError::Domain(_))));
        limits.add_point(1.0, 2.0).unwrap();
        assert!(matches!(
            limits.interpolate(1.0),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn interpolation_rejects_non_finite_frequency() {
        let limits = envelope(InterpolationMode::Linear);
        for frequency in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                limits.interpolate(frequency),
                Err(PoolError::Domain(_))
            ));
        }
    }

    #[test]
    fn freq_points_must_increase() {
        let mut limits = FreqLimits::new("dB");
        limits.add_point(10.0, 0.0).unwrap();
        assert!(limits.add_point(10.0, 1.0).is_err());
        assert!(limits.add_point(5.0, 1.0).is_err());
        limits.clear_points();
        assert!(limits.points().is_empty());
    }

    #[test]
    fn temp_limits_in_range() {
        let mut limits = TempLimits::new("V");
        limits.add_point(1.0, 0.0, 2.0).unwrap();
        limits.add_point(2.0, 1.0, 5.0).unwrap();
        limits.add_point(3.0, 4.0, 6.0).unwrap();
        assert!(limits.add_point(4.0, 4.0, 7.0).is_err());

        let inside = limits.get_limits_in_range(0.0, 5.0).unwrap();
        assert_eq!(inside.len(), 2);
        assert_eq!(inside[0].level, 1.0);
        assert_eq!(inside[1].level, 2.0);
        assert_eq!(limits.time_min(), Some(0.0));
        assert_eq!(limits.time_max(), Some(6.0));
        assert!(matches!(
            limits.get_limits_in_range(3.0, 1.0),
            Err(PoolError::Domain(_))
        ));
    }

    #[test]
    fn temporal_signal_requires_step_and_unit() {
        let err = DataKind::from_params(KindTag::TemporalSignal, &KindParams::default()).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
        let err = DataKind::from_params(KindTag::FreqSignal, &KindParams::temporal(0.1, "V"))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
        let err = DataKind::from_params(KindTag::TemporalSignal, &KindParams::temporal(0.0, "V"))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
    }

    #[test]
    fn sampling_rate_inverts_time_step() {
        let DataKind::TemporalSignal(mut signal) =
            DataKind::from_params(KindTag::TemporalSignal, &KindParams::temporal(0.01, "V")).unwrap()
        else {
            panic!("expected a temporal signal");
        };
        assert!((signal.sampling_rate() - 100.0).abs() < 1e-9);
        signal.set_sampling_rate(50.0).unwrap();
        assert!((signal.time_step - 0.02).abs() < 1e-12);
        assert!(signal.set_sampling_rate(0.0).is_err());
    }

    #[test]
    fn sample_type_overrides() {
        assert_eq!(
            KindTag::Constants.resolve_sample_type(Some(SampleType::Float64)).unwrap(),
            SampleType::Float64
        );
        assert_eq!(
            KindTag::Integers.resolve_sample_type(None).unwrap(),
            SampleType::Int32
        );
        assert!(KindTag::Integers
            .resolve_sample_type(Some(SampleType::Float32))
            .is_err());
        assert!(KindTag::FileList
            .resolve_sample_type(Some(SampleType::Int32))
            .is_err());
    }

    #[test]
    fn limits_payload_parses_pairs_and_triples() {
        let kind = DataKind::from_params(KindTag::FreqLimits, &KindParams::default()).unwrap();
        let parsed = kind
            .parse_payload(&Samples::Float64(vec![10.0, -20.0, 20.0, -10.0]))
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed.content_samples(),
            Some(Samples::Float64(vec![10.0, -20.0, 20.0, -10.0]))
        );
        assert!(kind.parse_payload(&Samples::Float64(vec![1.0, 2.0, 3.0])).is_err());

        let kind = DataKind::from_params(KindTag::TempLimits, &KindParams::default()).unwrap();
        assert!(kind.parse_payload(&Samples::Float64(vec![1.0, 2.0])).is_err());
        assert!(kind
            .parse_payload(&Samples::Float64(vec![1.0, 0.0, 1.0, 2.0, 1.0, 3.0]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn plain_kinds_carry_no_payload_metadata() {
        let kind = DataKind::from_params(KindTag::Constants, &KindParams::default()).unwrap();
        assert!(kind.parse_payload(&Samples::Float32(vec![1.0])).unwrap().is_none());
        assert!(kind.content_samples().is_none());
    }

    #[test]
    fn text_payload_is_a_single_string() {
        let kind = DataKind::from_params(KindTag::Text, &KindParams::default()).unwrap();
        assert!(kind
            .parse_payload(&Samples::Text(vec!["note".into()]))
            .unwrap()
            .is_none());
        for strings in [vec![], vec!["a".to_owned(), "b".to_owned()]] {
            assert!(matches!(
                kind.parse_payload(&Samples::Text(strings)),
                Err(PoolError::Format(_))
            ));
        }
        assert!(KindTag::Text.is_structured());
    }
}
