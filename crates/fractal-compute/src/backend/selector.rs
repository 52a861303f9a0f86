//! Platform and device selection.
//!
//! [`DeviceSelector`] enumerates platforms and devices, filters devices by
//! double-precision support and asks a [`SelectionStrategy`] to decide
//! whenever more than one candidate remains. Single candidates are taken
//! without consulting the strategy, but a preset index that does not
//! point at that candidate is still rejected.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::{ComputeError, ComputeResult};
use super::query::{self, AttributeScratch, has_double_precision};
use super::{ClRuntime, DeviceAttribute, DeviceCategory, PlatformAttribute};

/// Platform offered to a strategy.
#[derive(Debug, Clone)]
pub struct PlatformSummary {
    pub index: usize,
    pub name: String,
    /// Full attribute report.
    pub report: String,
}

/// Double-precision device offered to a strategy.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    /// Position among eligible devices.
    pub index: usize,
    /// Position in the platform's device list.
    pub device_index: usize,
    pub name: String,
}

/// Chooses among several platforms or eligible devices.
///
/// Returned indices must lie in `0..candidates.len()`; anything else fails
/// selection with [`ComputeError::InvalidSelection`].
pub trait SelectionStrategy {
    fn choose_platform(&mut self, platforms: &[PlatformSummary]) -> ComputeResult<usize>;

    fn choose_device(&mut self, devices: &[DeviceSummary]) -> ComputeResult<usize>;

    /// Platform index fixed before discovery, if any.
    fn preset_platform(&self) -> Option<usize> {
        None
    }

    /// Eligible-device index fixed before discovery, if any.
    fn preset_device(&self) -> Option<usize> {
        None
    }
}

/// Always takes the first candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstEligible;

impl SelectionStrategy for FirstEligible {
    fn choose_platform(&mut self, _platforms: &[PlatformSummary]) -> ComputeResult<usize> {
        Ok(0)
    }

    fn choose_device(&mut self, _devices: &[DeviceSummary]) -> ComputeResult<usize> {
        Ok(0)
    }
}

/// Preset indices with a fallback for whatever is left unset.
#[derive(Debug, Clone)]
pub struct Preset<S> {
    pub platform: Option<usize>,
    /// Index among eligible devices.
    pub device: Option<usize>,
    pub fallback: S,
}

impl<S: SelectionStrategy> Preset<S> {
    pub fn new(platform: Option<usize>, device: Option<usize>, fallback: S) -> Self {
        Self { platform, device, fallback }
    }
}

impl<S: SelectionStrategy> SelectionStrategy for Preset<S> {
    fn choose_platform(&mut self, platforms: &[PlatformSummary]) -> ComputeResult<usize> {
        match self.platform {
            Some(index) => Ok(index),
            None => self.fallback.choose_platform(platforms),
        }
    }

    fn choose_device(&mut self, devices: &[DeviceSummary]) -> ComputeResult<usize> {
        match self.device {
            Some(index) => Ok(index),
            None => self.fallback.choose_device(devices),
        }
    }

    fn preset_platform(&self) -> Option<usize> {
        self.platform.or(self.fallback.preset_platform())
    }

    fn preset_device(&self) -> Option<usize> {
        self.device.or(self.fallback.preset_device())
    }
}

/// Asks on a text stream until a valid index is entered.
pub struct InteractivePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractivePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str, count: usize) -> ComputeResult<usize> {
        if count == 0 {
            return Err(ComputeError::Prompt("nothing to choose from".into()));
        }
        let mut line = String::new();
        loop {
            write!(self.output, "{question} ").map_err(prompt_err)?;
            self.output.flush().map_err(prompt_err)?;

            line.clear();
            if self.input.read_line(&mut line).map_err(prompt_err)? == 0 {
                return Err(ComputeError::Prompt("input closed before a choice was made".into()));
            }
            match line.trim().parse::<usize>() {
                Ok(index) if index < count => return Ok(index),
                _ => {
                    debug!(answer = line.trim(), "Rejected selection");
                    writeln!(self.output, "Please enter a number from 0 to {}.", count - 1).map_err(prompt_err)?;
                }
            }
        }
    }
}

impl InteractivePrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> SelectionStrategy for InteractivePrompt<R, W> {
    fn choose_platform(&mut self, platforms: &[PlatformSummary]) -> ComputeResult<usize> {
        writeln!(self.output, "Found {} platforms:", platforms.len()).map_err(prompt_err)?;
        for p in platforms {
            writeln!(self.output, "Platform {}:\n{}", p.index, p.report).map_err(prompt_err)?;
        }
        self.ask("Which platform do you want to use?", platforms.len())
    }

    fn choose_device(&mut self, devices: &[DeviceSummary]) -> ComputeResult<usize> {
        for d in devices {
            writeln!(self.output, "Device {}: [{}]", d.index, d.name).map_err(prompt_err)?;
        }
        self.ask("Which device do you want to use?", devices.len())
    }
}

fn prompt_err(err: std::io::Error) -> ComputeError {
    ComputeError::Prompt(err.to_string())
}

/// Outcome of a successful selection.
#[derive(Debug, Clone)]
pub struct SelectedDevice<D> {
    pub platform_index: usize,
    pub platform_name: String,
    pub device: D,
    /// Position in the platform's device list.
    pub device_index: usize,
    pub device_name: String,
}

/// Selects a platform and a double-precision device.
pub struct DeviceSelector<'r, R: ClRuntime> {
    runtime: &'r R,
    platforms: Vec<R::Platform>,
    devices: Vec<R::Device>,
    scratch: AttributeScratch,
}

impl<'r, R: ClRuntime> DeviceSelector<'r, R> {
    /// Creates a selector; no runtime calls are made until [`select`](Self::select).
    pub fn new(runtime: &'r R) -> Self {
        Self {
            runtime,
            platforms: Vec::new(),
            devices: Vec::new(),
            scratch: AttributeScratch::new(),
        }
    }

    /// Platforms found by the last selection.
    pub fn platforms(&self) -> &[R::Platform] {
        &self.platforms
    }

    /// Devices of the chosen platform found by the last selection.
    pub fn devices(&self) -> &[R::Device] {
        &self.devices
    }

    /// Runs discovery and selection.
    pub fn select(
        &mut self,
        category: DeviceCategory,
        strategy: &mut dyn SelectionStrategy,
    ) -> ComputeResult<SelectedDevice<R::Device>> {
        let runtime = self.runtime;

        self.platforms = query::list_platforms(runtime)?;
        if self.platforms.is_empty() {
            return Err(ComputeError::NoPlatforms);
        }

        let platform_index = if self.platforms.len() > 1 {
            let mut summaries = Vec::with_capacity(self.platforms.len());
            for (index, &platform) in self.platforms.iter().enumerate() {
                summaries.push(PlatformSummary {
                    index,
                    name: self.scratch.platform_attribute(runtime, platform, PlatformAttribute::Name)?,
                    report: query::describe_platform(runtime, platform, &mut self.scratch)?,
                });
            }
            info!(count = summaries.len(), "Found multiple platforms");
            checked(strategy.choose_platform(&summaries)?, summaries.len())?
        } else {
            if let Some(index) = strategy.preset_platform() {
                checked(index, 1)?;
            }
            0
        };

        let platform = self.platforms[platform_index];
        let platform_name = self.scratch.platform_attribute(runtime, platform, PlatformAttribute::Name)?;
        info!(
            "Using platform {}:\n{}",
            platform_index,
            query::describe_platform(runtime, platform, &mut self.scratch)?
        );

        self.devices = query::list_devices(runtime, platform, category)?;
        if self.devices.is_empty() {
            return Err(ComputeError::NoDevicesAvailable);
        }

        let mut eligible = Vec::new();
        for (device_index, &device) in self.devices.iter().enumerate() {
            let extensions = self.scratch.device_attribute(runtime, device, DeviceAttribute::Extensions)?;
            let name = self.scratch.device_attribute(runtime, device, DeviceAttribute::Name)?;
            if has_double_precision(&extensions) {
                info!("Device {}: [{}] supports double precision.", eligible.len(), name);
                eligible.push(DeviceSummary {
                    index: eligible.len(),
                    device_index,
                    name,
                });
            } else {
                debug!(device_index, %name, "Device lacks double precision");
            }
        }

        let chosen = match eligible.len() {
            0 => return Err(ComputeError::NoCapableDevice),
            1 => {
                if let Some(index) = strategy.preset_device() {
                    checked(index, 1)?;
                }
                info!("No other device in the requested category supports double precision; using the one found.");
                0
            }
            n => checked(strategy.choose_device(&eligible)?, n)?,
        };

        let summary = &eligible[chosen];
        if eligible.len() > 1 {
            info!(device = %summary.name, "Selected device {}", chosen);
        }
        Ok(SelectedDevice {
            platform_index,
            platform_name,
            device: self.devices[summary.device_index],
            device_index: summary.device_index,
            device_name: summary.name.clone(),
        })
    }
}

fn checked(index: usize, count: usize) -> ComputeResult<usize> {
    if index < count {
        Ok(index)
    } else {
        warn!(index, count, "Selection out of range");
        Err(ComputeError::InvalidSelection { index, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn devices(n: usize) -> Vec<DeviceSummary> {
        (0..n)
            .map(|i| DeviceSummary { index: i, device_index: i * 2, name: format!("dev{i}") })
            .collect()
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let input = Cursor::new("abc\n7\n1\n");
        let mut out = Vec::new();
        let mut prompt = InteractivePrompt::new(input, &mut out);
        assert_eq!(prompt.choose_device(&devices(2)).unwrap(), 1);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Which device do you want to use?").count(), 3);
        assert!(text.contains("Device 0: [dev0]"));
    }

    #[test]
    fn test_prompt_eof() {
        let mut prompt = InteractivePrompt::new(Cursor::new(""), Vec::new());
        let err = prompt.choose_device(&devices(3)).unwrap_err();
        assert!(matches!(err, ComputeError::Prompt(_)));
    }

    #[test]
    fn test_prompt_without_candidates() {
        let mut out = Vec::new();
        let mut prompt = InteractivePrompt::new(Cursor::new("0\n"), &mut out);
        let err = prompt.choose_device(&[]).unwrap_err();
        assert!(matches!(err, ComputeError::Prompt(_)));
        assert!(prompt.choose_platform(&[]).is_err());
        drop(prompt);
        assert!(!String::from_utf8(out).unwrap().contains("Which"));
    }

    #[test]
    fn test_preset_falls_back() {
        let mut preset = Preset::new(Some(2), None, FirstEligible);
        assert_eq!(preset.choose_platform(&[]).unwrap(), 2);
        assert_eq!(preset.choose_device(&devices(4)).unwrap(), 0);
        assert_eq!((preset.preset_platform(), preset.preset_device()), (Some(2), None));
        assert_eq!(FirstEligible.preset_platform(), None);
    }

    #[test]
    fn test_checked() {
        assert_eq!(checked(1, 2).unwrap(), 1);
        assert!(matches!(checked(2, 2), Err(ComputeError::InvalidSelection { index: 2, count: 2 })));
    }
}
