//! Device assembly: real GPIO/SPI with feature `hardware`, simulation otherwise.

use eyre::{Result, WrapErr};
use raincatch_config::Config;
use raincatch_core::Devices;
use raincatch_core::mocks::{AlwaysConnected, OfflineHttp};
use raincatch_traits::{Connectivity, HttpClient};

/// Starting headroom of the simulated tank.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const SIM_START_CM: f32 = 20.0;

/// Reads per dry/wet spell of the simulated rain sensor; overridable for bench runs.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_rain_spell() -> u32 {
    std::env::var("RAINCATCH_SIM_RAIN_SPELL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3)
}

pub fn assemble(cfg: &Config, offline: bool) -> Result<Devices> {
    let (ranger, rain_sensor, stepper) = open_sensors(cfg)?;
    let (http, link) = open_network(cfg, offline);
    Ok(Devices {
        ranger,
        rain_sensor,
        stepper,
        http,
        link,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
#[allow(clippy::type_complexity)]
fn open_sensors(
    cfg: &Config,
) -> Result<(
    Box<dyn raincatch_traits::RangeSensor>,
    Box<dyn raincatch_traits::RainSensor>,
    Box<dyn raincatch_traits::StepperDriver>,
)> {
    use raincatch_hardware::hardware::{Mcp3008RainSensor, open_ranger, open_stepper};

    let p = &cfg.pins;
    let ranger = open_ranger(
        p.trigger,
        p.echo,
        std::time::Duration::from_millis(cfg.sensing.echo_timeout_ms),
    )
    .wrap_err("open ultrasonic pins")?;
    let stepper =
        open_stepper(p.motor_en, p.motor_dir, p.motor_step).wrap_err("open stepper pins")?;
    let rain = Mcp3008RainSensor::new(p.rain_adc_channel).wrap_err("open rain adc")?;
    tracing::info!(?p, "hardware devices ready");
    Ok((Box::new(ranger), Box::new(rain), Box::new(stepper)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
#[allow(clippy::type_complexity, clippy::unnecessary_wraps)]
fn open_sensors(
    _cfg: &Config,
) -> Result<(
    Box<dyn raincatch_traits::RangeSensor>,
    Box<dyn raincatch_traits::RainSensor>,
    Box<dyn raincatch_traits::StepperDriver>,
)> {
    use raincatch_hardware::{SimulatedRainSensor, SimulatedRanger, SimulatedStepper};

    let spell = sim_rain_spell();
    tracing::info!(start_cm = SIM_START_CM, spell, "using simulated devices");
    Ok((
        Box::new(SimulatedRanger::new(SIM_START_CM)),
        Box::new(SimulatedRainSensor::new(spell)),
        Box::new(SimulatedStepper::new()),
    ))
}

fn open_network(cfg: &Config, offline: bool) -> (Box<dyn HttpClient>, Box<dyn Connectivity>) {
    if offline {
        tracing::info!("offline: weather, override and telemetry disabled");
        return (Box::new(OfflineHttp), Box::new(AlwaysConnected));
    }

    #[cfg(feature = "network")]
    {
        use raincatch_hardware::net::{HostConnectivity, UreqClient};

        let timeout = std::time::Duration::from_millis(cfg.telemetry.http_timeout_ms);
        let link: Box<dyn Connectivity> = match probe_target(cfg) {
            Some(probe) => {
                tracing::debug!(%probe, "link probe");
                Box::new(HostConnectivity::new(probe, timeout))
            }
            None => {
                tracing::warn!(
                    base_url = %cfg.telemetry.base_url,
                    "no link probe; assuming connected"
                );
                Box::new(AlwaysConnected)
            }
        };
        (Box::new(UreqClient::new(timeout)), link)
    }
    #[cfg(not(feature = "network"))]
    {
        let _ = cfg;
        tracing::warn!("built without network support; running offline");
        (Box::new(OfflineHttp), Box::new(AlwaysConnected))
    }
}

/// `host:port` probed for link state: `[network] probe` when set, otherwise
/// the telemetry server with the scheme's default port.
#[cfg_attr(not(feature = "network"), allow(dead_code))]
fn probe_target(cfg: &Config) -> Option<String> {
    let explicit = cfg.network.probe.as_deref().map(str::trim);
    if let Some(probe) = explicit.filter(|p| !p.is_empty()) {
        return Some(probe.to_string());
    }
    let (default_port, rest) = match cfg.telemetry.base_url.split_once("://") {
        Some(("https", rest)) => (443, rest),
        Some(("http", rest)) => (80, rest),
        _ => return None,
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    if host_port.is_empty() {
        return None;
    }
    let has_port = host_port
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
    if has_port {
        Some(host_port.to_string())
    } else {
        Some(format!("{host_port}:{default_port}"))
    }
}
