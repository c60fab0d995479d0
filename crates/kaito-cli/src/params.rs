//! Generation parameters for chat completions.
//!
//! Every field is range-checked when it is set. Out-of-range values are
//! rejected with a validation error and never clamped.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::CliError;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default completion token limit.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Allowed temperature range.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
/// Allowed top-p range.
pub const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// A parameter that can be changed with `/set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// `temperature`
    Temperature,
    /// `max_tokens`
    MaxTokens,
    /// `top_p`
    TopP,
}

impl Param {
    /// Names accepted by `/set`.
    pub const NAMES: &'static str = "temperature, max_tokens, top_p";
}

impl FromStr for Param {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Self::Temperature),
            "max_tokens" => Ok(Self::MaxTokens),
            "top_p" => Ok(Self::TopP),
            other => Err(CliError::validation(format!("unknown parameter: {other}"))),
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    system_prompt: Option<String>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl GenerationParams {
    /// Build validated parameters. An empty system prompt counts as none.
    ///
    /// `max_tokens` is signed so a negative flag value reaches validation
    /// instead of failing as a parse error.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] if any value is out of range.
    pub fn new(
        system_prompt: Option<String>,
        temperature: f64,
        max_tokens: i64,
        top_p: f64,
    ) -> Result<Self, CliError> {
        let mut params = Self::default();
        params.set_temperature(temperature)?;
        params.set_max_tokens(max_tokens)?;
        params.set_top_p(top_p)?;
        params.system_prompt = system_prompt.filter(|s| !s.is_empty());
        Ok(params)
    }

    /// System prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Completion token limit.
    #[must_use]
    pub const fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Nucleus sampling threshold.
    #[must_use]
    pub const fn top_p(&self) -> f64 {
        self.top_p
    }

    /// Set the temperature.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] outside `0.0..=2.0`. State is unchanged on error.
    pub fn set_temperature(&mut self, value: f64) -> Result<(), CliError> {
        if !TEMPERATURE_RANGE.contains(&value) {
            return Err(CliError::validation(
                "temperature must be between 0.0 and 2.0",
            ));
        }
        self.temperature = value;
        Ok(())
    }

    /// Set the token limit.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] unless `0 < value <= u32::MAX`. State is
    /// unchanged on error.
    pub fn set_max_tokens(&mut self, value: i64) -> Result<(), CliError> {
        if value <= 0 {
            return Err(CliError::validation("max-tokens must be greater than 0"));
        }
        self.max_tokens = u32::try_from(value).map_err(|_| {
            CliError::validation(format!("max-tokens must be at most {}", u32::MAX))
        })?;
        Ok(())
    }

    /// Set top-p.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] outside `0.0..=1.0`. State is unchanged on error.
    pub fn set_top_p(&mut self, value: f64) -> Result<(), CliError> {
        if !TOP_P_RANGE.contains(&value) {
            return Err(CliError::validation("top-p must be between 0.0 and 1.0"));
        }
        self.top_p = value;
        Ok(())
    }

    /// Parse `raw` and assign it to `param`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] if `raw` does not parse or is out of range.
    pub fn set(&mut self, param: Param, raw: &str) -> Result<(), CliError> {
        match param {
            Param::Temperature => {
                let value = parse_float(raw, "temperature")?;
                self.set_temperature(value)
            }
            Param::MaxTokens => {
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| CliError::validation("max_tokens must be a positive integer"))?;
                self.set_max_tokens(value)
            }
            Param::TopP => {
                let value = parse_float(raw, "top_p")?;
                self.set_top_p(value)
            }
        }
    }
}

fn parse_float(raw: &str, name: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CliError::validation(format!("{name} must be a number, got '{raw}'")))
}

impl fmt::Display for GenerationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Temperature: {:.1}", self.temperature)?;
        writeln!(f, "  Max tokens: {}", self.max_tokens)?;
        write!(f, "  Top-p: {:.1}", self.top_p)?;
        if let Some(prompt) = &self.system_prompt {
            write!(f, "\n  System prompt: {prompt}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn defaults() {
        let p = GenerationParams::default();
        assert!((p.temperature() - 0.7).abs() < f64::EPSILON);
        assert_eq!(p.max_tokens(), 1024);
        assert!((p.top_p() - 0.9).abs() < f64::EPSILON);
        assert_eq!(p.system_prompt(), None);
    }

    #[test]
    fn empty_system_prompt_is_none() {
        let p = GenerationParams::new(Some(String::new()), 0.7, 1024, 0.9).expect("valid");
        assert_eq!(p.system_prompt(), None);
        let p = GenerationParams::new(Some("be terse".into()), 0.7, 1024, 0.9).expect("valid");
        assert_eq!(p.system_prompt(), Some("be terse"));
    }

    #[test_case(0.0, 1, 0.0 ; "lower bounds")]
    #[test_case(2.0, 4096, 1.0 ; "upper bounds")]
    fn boundaries_accepted(t: f64, m: i64, p: f64) {
        assert!(GenerationParams::new(None, t, m, p).is_ok());
    }

    #[test_case("temperature", "1.5" ; "temperature")]
    #[test_case("max_tokens", "256" ; "max tokens")]
    #[test_case("top_p", "0.5" ; "top p")]
    fn set_by_name(name: &str, value: &str) {
        let mut p = GenerationParams::default();
        let param: Param = name.parse().expect("known param");
        p.set(param, value).expect("in range");
        assert_ne!(p, GenerationParams::default());
    }

    #[test_case("temperature", "5" ; "temperature too high")]
    #[test_case("temperature", "-0.1" ; "temperature negative")]
    #[test_case("temperature", "warm" ; "temperature not a number")]
    #[test_case("temperature", "NaN" ; "temperature nan")]
    #[test_case("max_tokens", "0" ; "zero tokens")]
    #[test_case("max_tokens", "-3" ; "negative tokens")]
    #[test_case("max_tokens", "1.5" ; "fractional tokens")]
    #[test_case("top_p", "1.01" ; "top p too high")]
    fn set_rejects_and_keeps_state(name: &str, value: &str) {
        let mut p = GenerationParams::default();
        let param: Param = name.parse().expect("known param");
        let err = p.set(param, value).expect_err("should reject");
        assert!(matches!(err, CliError::Validation(_)));
        assert_eq!(p, GenerationParams::default());
    }

    #[test]
    fn max_tokens_beyond_u32_has_its_own_message() {
        let err = GenerationParams::new(None, 0.7, 5_000_000_000, 0.9).expect_err("too large");
        assert_eq!(
            err.to_string(),
            "validation failed: max-tokens must be at most 4294967295"
        );

        let mut p = GenerationParams::default();
        let err = p.set(Param::MaxTokens, "5000000000").expect_err("too large");
        assert!(err.to_string().contains("at most"));
        assert_eq!(p, GenerationParams::default());
    }

    #[test]
    fn unknown_param() {
        assert!("frequency_penalty".parse::<Param>().is_err());
    }

    #[test]
    fn display_lists_values() {
        let mut p = GenerationParams::default();
        p.set_temperature(1.5).expect("in range");
        let shown = p.to_string();
        assert!(shown.contains("Temperature: 1.5"));
        assert!(shown.contains("Max tokens: 1024"));
        assert!(shown.contains("Top-p: 0.9"));
        assert!(!shown.contains("System prompt"));
    }

    proptest! {
        #[test]
        fn temperature_outside_range_rejected(t in prop_oneof![-1.0e6..-1.0e-9f64, 2.000_000_1..1.0e6f64]) {
            prop_assert!(GenerationParams::new(None, t, 1024, 0.9).is_err());
        }

        #[test]
        fn top_p_outside_range_rejected(p in prop_oneof![-1.0e6..-1.0e-9f64, 1.000_000_1..1.0e6f64]) {
            prop_assert!(GenerationParams::new(None, 0.7, 1024, p).is_err());
        }

        #[test]
        fn non_positive_max_tokens_rejected(m in i64::MIN..=0i64) {
            prop_assert!(GenerationParams::new(None, 0.7, m, 0.9).is_err());
        }

        #[test]
        fn in_range_values_accepted(t in 0.0..=2.0f64, m in 1..=100_000i64, p in 0.0..=1.0f64) {
            let params = GenerationParams::new(None, t, m, p).expect("in range");
            prop_assert!((params.temperature() - t).abs() < f64::EPSILON);
            prop_assert_eq!(i64::from(params.max_tokens()), m);
            prop_assert!((params.top_p() - p).abs() < f64::EPSILON);
        }
    }
}
