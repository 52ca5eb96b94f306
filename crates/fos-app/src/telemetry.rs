use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use fos_core::tone::RawSample;
use fos_core::traits::TelemetrySource;

/// Recorded telemetry, one `aoa ias` pair per line.
///
/// Fields are separated by whitespace or a comma. Blank lines and anything
/// after `#` are ignored.
pub struct ReplaySource {
    name: String,
    samples: std::vec::IntoIter<RawSample>,
}

impl ReplaySource {
    /// Read and parse a replay file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or any line is malformed.
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read telemetry file {}", path.display()))?;
        Self::parse(&path.display().to_string(), &text)
    }

    /// Parse replay text.
    ///
    /// # Errors
    /// Returns an error naming the first malformed line.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut samples = Vec::new();
        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let sample =
                parse_line(line).with_context(|| format!("{name}:{}: bad record", idx + 1))?;
            samples.push(sample);
        }
        log::info!("Loaded {} telemetry records from {name}", samples.len());
        Ok(Self {
            name: name.to_string(),
            samples: samples.into_iter(),
        })
    }
}

fn parse_line(line: &str) -> Result<RawSample> {
    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    let [aoa, ias] = fields.as_slice() else {
        anyhow::bail!("expected `aoa ias`, found {} field(s)", fields.len());
    };
    let aoa: f32 = aoa.parse().with_context(|| format!("invalid AOA '{aoa}'"))?;
    let ias: f32 = ias.parse().with_context(|| format!("invalid IAS '{ias}'"))?;
    Ok(RawSample::new(aoa, ias))
}

impl TelemetrySource for ReplaySource {
    fn sample(&mut self) -> Option<RawSample> {
        self.samples.next()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `FROM:TO:IAS` argument of `--sweep`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepSpec {
    pub from_aoa: f32,
    pub to_aoa: f32,
    pub ias: f32,
}

impl FromStr for SweepSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [from, to, ias] = parts.as_slice() else {
            return Err(format!("expected FROM:TO:IAS, got '{s}'"));
        };
        let num = |field: &str, what: &str| -> Result<f32, String> {
            let v: f32 = field
                .trim()
                .parse()
                .map_err(|_| format!("invalid {what} '{field}'"))?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(format!("{what} must be finite"))
            }
        };
        Ok(Self {
            from_aoa: num(from, "start AOA")?,
            to_aoa: num(to, "end AOA")?,
            ias: num(ias, "IAS")?,
        })
    }
}

impl fmt::Display for SweepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.from_aoa, self.to_aoa, self.ias)
    }
}

/// Linear AOA ramp at constant airspeed, `steps` readings long.
pub struct SweepSource {
    name: String,
    spec: SweepSpec,
    steps: usize,
    next: usize,
}

impl SweepSource {
    #[must_use]
    pub fn new(spec: SweepSpec, steps: usize) -> Self {
        Self {
            name: format!("sweep {spec}"),
            spec,
            steps,
            next: 0,
        }
    }
}

impl TelemetrySource for SweepSource {
    fn sample(&mut self) -> Option<RawSample> {
        if self.next >= self.steps {
            return None;
        }
        let t = if self.steps > 1 {
            self.next as f32 / (self.steps - 1) as f32
        } else {
            0.0
        };
        self.next += 1;
        let aoa = self.spec.from_aoa + t * (self.spec.to_aoa - self.spec.from_aoa);
        Some(RawSample::new(aoa, self.spec.ias))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut dyn TelemetrySource) -> Vec<RawSample> {
        std::iter::from_fn(|| source.sample()).collect()
    }

    #[test]
    fn replay_accepts_spaces_commas_and_comments() {
        let text = "# aoa ias\n6.0 30\n\n6.5,31.5  # turning final\n  7.0 ,\t32\n";
        let mut source = ReplaySource::parse("approach", text).unwrap();
        assert_eq!(
            drain(&mut source),
            vec![
                RawSample::new(6.0, 30.0),
                RawSample::new(6.5, 31.5),
                RawSample::new(7.0, 32.0),
            ]
        );
        assert!(source.sample().is_none());
    }

    #[test]
    fn replay_reports_the_bad_line() {
        let err = ReplaySource::parse("log", "6.0 30\n6.5\n").err().unwrap();
        assert!(format!("{err:#}").contains("log:2"), "{err:#}");
        assert!(ReplaySource::parse("log", "6.0 fast").is_err());
    }

    #[test]
    fn replay_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.txt");
        std::fs::write(&path, "8.0 60\n").unwrap();
        let mut source = ReplaySource::open(&path).unwrap();
        assert_eq!(source.sample(), Some(RawSample::new(8.0, 60.0)));
        assert!(ReplaySource::open(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn sweep_spec_parses() {
        let spec: SweepSpec = "4:14.5:60".parse().unwrap();
        assert_eq!(
            spec,
            SweepSpec {
                from_aoa: 4.0,
                to_aoa: 14.5,
                ias: 60.0
            }
        );
        assert!("4:14".parse::<SweepSpec>().is_err());
        assert!("a:14:60".parse::<SweepSpec>().is_err());
        assert!("4:inf:60".parse::<SweepSpec>().is_err());
    }

    #[test]
    fn sweep_covers_both_endpoints() {
        let spec: SweepSpec = "4:14:60".parse().unwrap();
        let samples = drain(&mut SweepSource::new(spec, 11));
        assert_eq!(samples.len(), 11);
        assert_eq!(samples[0], RawSample::new(4.0, 60.0));
        assert_eq!(samples[10], RawSample::new(14.0, 60.0));
        assert!(samples.windows(2).all(|w| w[1].aoa_degrees > w[0].aoa_degrees));
    }
}
