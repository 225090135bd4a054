use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::hazard::HazardMatrix;
use crate::packer::PackingConfig;
use crate::validator::ValidationConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub packer: PackerConfig,
    pub validator: ValidatorConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            packer: PackerConfig::from_env(),
            validator: ValidatorConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "LOAD_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "LOAD_PLANNER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = env_string(Self::PORT_VAR)
            .map(|raw| parse_port(&raw, Self::PORT_VAR).unwrap_or(Self::DEFAULT_PORT))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for the packing heuristic.
#[derive(Clone, Debug)]
pub struct PackerConfig {
    packing: PackingConfig,
}

impl PackerConfig {
    const GRID_STEP_VAR: &'static str = "LOAD_PLANNER_PACKING_GRID_STEP";
    const CHECK_STACK_COLLISIONS_VAR: &'static str = "LOAD_PLANNER_PACKING_CHECK_STACK_COLLISIONS";
    const RESPECT_PAYLOAD_VAR: &'static str = "LOAD_PLANNER_PACKING_RESPECT_PAYLOAD";

    fn from_env() -> Self {
        let grid_step = load_f64_with_warning(
            Self::GRID_STEP_VAR,
            PackingConfig::DEFAULT_GRID_STEP,
            valid_grid_step,
            "must be at least 1 mm",
            "Adjusted grid step changes every floor position",
        );

        let check_stack_collisions = load_bool(
            Self::CHECK_STACK_COLLISIONS_VAR,
            PackingConfig::DEFAULT_CHECK_STACK_COLLISIONS,
        );
        if !check_stack_collisions {
            warn!(
                "{} is off: stacked units are only checked against the trailer bounds",
                Self::CHECK_STACK_COLLISIONS_VAR
            );
        }

        let respect_payload = load_bool(
            Self::RESPECT_PAYLOAD_VAR,
            PackingConfig::DEFAULT_RESPECT_PAYLOAD,
        );

        let packing = PackingConfig::builder()
            .grid_step(grid_step)
            .check_stack_collisions(check_stack_collisions)
            .respect_payload(respect_payload)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

/// Configuration for the rule engine.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    validation: ValidationConfig,
}

impl ValidatorConfig {
    const PAYLOAD_WARNING_RATIO_VAR: &'static str = "LOAD_PLANNER_VALIDATION_PAYLOAD_WARNING_RATIO";
    const FRAGILE_WEIGHT_LIMIT_VAR: &'static str = "LOAD_PLANNER_VALIDATION_FRAGILE_WEIGHT_LIMIT";
    const HAZARD_DISTANCE_VAR: &'static str = "LOAD_PLANNER_VALIDATION_HAZARD_DISTANCE";
    const HAZARD_PAIRS_VAR: &'static str = "LOAD_PLANNER_VALIDATION_HAZARD_PAIRS";

    fn from_env() -> Self {
        let payload_warning_ratio = load_f64_with_warning(
            Self::PAYLOAD_WARNING_RATIO_VAR,
            ValidationConfig::DEFAULT_PAYLOAD_WARNING_RATIO,
            |value| value > 0.0 && value <= 1.0,
            "must be greater than 0 and at most 1",
            "Adjusted payload warning threshold",
        );

        let fragile_weight_limit = load_f64_with_warning(
            Self::FRAGILE_WEIGHT_LIMIT_VAR,
            ValidationConfig::DEFAULT_FRAGILE_WEIGHT_LIMIT,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted weight limit for units on fragile cargo",
        );

        let hazard_distance = load_f64_with_warning(
            Self::HAZARD_DISTANCE_VAR,
            ValidationConfig::DEFAULT_HAZARD_DISTANCE,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted hazardous goods separation distance",
        );

        let hazard_matrix = env_string(Self::HAZARD_PAIRS_VAR)
            .and_then(|raw| parse_hazard_pairs(&raw, Self::HAZARD_PAIRS_VAR))
            .unwrap_or_default();

        let validation = ValidationConfig::builder()
            .payload_warning_ratio(payload_warning_ratio)
            .fragile_weight_limit(fragile_weight_limit)
            .hazard_distance(hazard_distance)
            .hazard_matrix(hazard_matrix)
            .build();

        Self { validation }
    }

    /// Returns the configured ValidationConfig.
    pub fn validation_config(&self) -> &ValidationConfig {
        &self.validation
    }
}

fn valid_grid_step(value: f64) -> bool {
    value >= PackingConfig::MIN_GRID_STEP
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_port(raw: &str, var_name: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) => {
            warn!("{} must not be 0. Using default value.", var_name);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using default value.",
                var_name, raw, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_bool(var_name: &str, default: bool) -> bool {
    env_string(var_name)
        .and_then(|raw| parse_bool(&raw, var_name))
        .unwrap_or(default)
}

fn parse_hazard_pairs(raw: &str, var_name: &str) -> Option<HazardMatrix> {
    match HazardMatrix::parse(raw) {
        Ok(matrix) => {
            info!(
                "{} sets {} incompatible hazard class pair(s)",
                var_name,
                matrix.len()
            );
            Some(matrix)
        }
        Err(entry) => {
            warn!(
                "{} contains malformed pair '{}', expected 'a:b'. Using default pairs.",
                var_name, entry
            );
            None
        }
    }
}

fn parse_f64(
    raw: &str,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => value,
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    let Some(raw) = env_string(var_name) else {
        return default;
    };
    let value = parse_f64(&raw, var_name, default, validator, invalid_hint);
    let tolerance = (default.abs().max(1.0)) * 1e-9;
    if (value - default).abs() > tolerance {
        info!("{} ({} = {}).", notice, var_name, value);
    }
    value
}
