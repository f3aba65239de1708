use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use raincatch_core::{LidAction, LidController, LidError, LidOverrideCommand, LidState, Trigger};
use raincatch_traits::{
    BoxError, HttpClient, HttpResponse, ManualClock, RainSensor, RangeSensor, Rotation,
    StepperDriver,
};
use serde_json::{Value, json};

const BOOT_UNIX: i64 = 1_709_307_005; // 2024/03/02 01:30:05 in UTC+10
const ECHO_2_LITRES: u32 = 1_060;
const ECHO_FULL_TANK: u32 = 50;
const WET: u16 = 1_200;
const DRY: u16 = 3_900;
const CLEAR: &str = r#"{"weather":[{"main":"Clear","description":"clear sky"}]}"#;

/// Shared knobs and recordings for one simulated installation.
#[derive(Clone)]
struct Bench {
    echo_us: Rc<Cell<Option<u32>>>,
    rain_raw: Rc<Cell<u16>>,
    weather: Rc<RefCell<String>>,
    lid_status: Rc<RefCell<String>>,
    post_status: Rc<Cell<u16>>,
    posts: Rc<RefCell<Vec<(String, Value)>>>,
    steps: Rc<RefCell<Vec<(Rotation, u32)>>>,
    releases: Rc<Cell<u32>>,
}

impl Bench {
    fn new() -> Self {
        Self {
            echo_us: Rc::new(Cell::new(Some(ECHO_2_LITRES))),
            rain_raw: Rc::new(Cell::new(DRY)),
            weather: Rc::new(RefCell::new(CLEAR.to_string())),
            lid_status: Rc::new(RefCell::new(r#"{"lidStatus":"reset"}"#.to_string())),
            post_status: Rc::new(Cell::new(200)),
            posts: Rc::new(RefCell::new(Vec::new())),
            steps: Rc::new(RefCell::new(Vec::new())),
            releases: Rc::new(Cell::new(0)),
        }
    }

    fn set_override(&self, status: &str) {
        *self.lid_status.borrow_mut() = json!({ "lidStatus": status }).to_string();
    }

    fn endpoints(&self) -> Vec<String> {
        self.posts
            .borrow()
            .iter()
            .map(|(url, _)| url.trim_start_matches("https://smartdrop.uqcloud.net").to_string())
            .collect()
    }

    fn take_posts(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.posts.borrow_mut())
    }
}

struct BenchRanger(Bench);
impl RangeSensor for BenchRanger {
    fn measure(&mut self) -> Option<u32> {
        self.0.echo_us.get()
    }
}

struct BenchRain(Bench);
impl RainSensor for BenchRain {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        Ok(self.0.rain_raw.get())
    }
}

struct BenchHttp(Bench);
impl HttpClient for BenchHttp {
    fn get(&mut self, url: &str) -> Result<HttpResponse, BoxError> {
        let body = if url.ends_with("/api/LidUpdate") {
            self.0.lid_status.borrow().clone()
        } else {
            self.0.weather.borrow().clone()
        };
        Ok(HttpResponse::new(200, body))
    }
    fn post_json(&mut self, url: &str, body: &str) -> Result<HttpResponse, BoxError> {
        let v: Value = serde_json::from_str(body)?;
        self.0.posts.borrow_mut().push((url.to_string(), v));
        Ok(HttpResponse::new(self.0.post_status.get(), ""))
    }
}

/// Records (direction, rising edges) for every enable window.
struct BenchStepper {
    bench: Bench,
    rotation: Rotation,
    edges: u32,
    enabled: bool,
}
impl StepperDriver for BenchStepper {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        if enabled {
            self.edges = 0;
        } else {
            self.bench.releases.set(self.bench.releases.get() + 1);
            if self.enabled {
                self.bench.steps.borrow_mut().push((self.rotation, self.edges));
            }
        }
        self.enabled = enabled;
        Ok(())
    }
    fn set_direction(&mut self, rotation: Rotation) -> Result<(), BoxError> {
        self.rotation = rotation;
        Ok(())
    }
    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        if high && self.enabled {
            self.edges += 1;
        }
        Ok(())
    }
}

fn controller(bench: &Bench, clock: &ManualClock) -> LidController {
    LidController::builder()
        .with_ranger(BenchRanger(bench.clone()))
        .with_rain_sensor(BenchRain(bench.clone()))
        .with_stepper(BenchStepper {
            bench: bench.clone(),
            rotation: Rotation::Clockwise,
            edges: 0,
            enabled: false,
        })
        .with_http(BenchHttp(bench.clone()))
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build controller")
}

fn open_lid(bench: &Bench, ctl: &mut LidController) {
    bench.rain_raw.set(WET);
    let r = ctl.cycle();
    assert_eq!(r.actions, vec![LidAction::Opened(Trigger::Rain)]);
    bench.take_posts();
    bench.steps.borrow_mut().clear();
}

#[test]
fn boot_releases_driver_before_anything_moves() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    ctl.cycle();
    assert_eq!(bench.releases.get(), 1);
    assert!(bench.steps.borrow().is_empty());
    assert!(bench.posts.borrow().is_empty());
}

#[test]
fn rain_with_room_opens_once() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.rain_raw.set(WET);

    let r = ctl.cycle();
    assert_eq!(r.timestamp, "2024/03/02 01:30:05");
    assert!(r.raining);
    assert_eq!(r.actions, vec![LidAction::Opened(Trigger::Rain)]);
    assert_eq!(r.lid, LidState::OpenRaining);
    assert!(ctl.state().lid_open);
    assert!(ctl.state().last_open_epoch.is_some());
    assert_eq!(*bench.steps.borrow(), vec![(Rotation::CounterClockwise, 155)]);
    assert_eq!(
        bench.take_posts(),
        vec![(
            "https://smartdrop.uqcloud.net/api/lidStatusData".to_string(),
            json!([{"timestamp": "2024/03/02 01:30:05", "lidStatus": "open"}])
        )]
    );

    clock.advance(Duration::from_secs(300));
    let r = ctl.cycle();
    assert!(r.actions.is_empty());
    assert!(bench.posts.borrow().is_empty());
    assert_eq!(bench.steps.borrow().len(), 1);
}

#[test]
fn rain_stopping_closes_and_reports_in_order() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    open_lid(&bench, &mut ctl);

    clock.advance(Duration::from_secs(3_600));
    bench.rain_raw.set(DRY);
    let r = ctl.cycle();

    assert_eq!(r.actions, vec![LidAction::Closed(Trigger::Rain)]);
    assert_eq!(r.lid, LidState::ClosedDry);
    assert!(!ctl.state().lid_open);
    assert_eq!(ctl.state().last_open_epoch, None);
    assert_eq!(*bench.steps.borrow(), vec![(Rotation::Clockwise, 160)]);
    assert_eq!(
        bench.endpoints(),
        vec!["/api/tankData", "/api/lidStatusData", "/api/currentLevelData"]
    );

    let posts = bench.take_posts();
    let tank = &posts[0].1[0];
    let hours = tank["hours"].as_i64().unwrap();
    assert!((3_600..3_700).contains(&hours), "open duration {hours}");
    assert!((tank["waterLevel"].as_f64().unwrap() - 2.0).abs() < 0.01);
    assert_eq!(posts[1].1[0]["lidStatus"], "close");
    assert!((posts[2].1[0]["currentLevel"].as_f64().unwrap() - 2.0).abs() < 0.01);
}

#[test]
fn full_tank_keeps_lid_shut_and_closes_open_lid() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.echo_us.set(Some(ECHO_FULL_TANK));
    bench.rain_raw.set(WET);
    let r = ctl.cycle();
    assert!(r.raining);
    assert!(r.actions.is_empty());

    bench.echo_us.set(Some(ECHO_2_LITRES));
    open_lid(&bench, &mut ctl);
    bench.echo_us.set(Some(ECHO_FULL_TANK));
    let r = ctl.cycle();
    assert_eq!(r.actions, vec![LidAction::Closed(Trigger::Rain)]);
}

#[test]
fn failed_volume_read_blocks_open_and_reports_sentinel() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.echo_us.set(None);
    bench.rain_raw.set(WET);

    let r = ctl.cycle();
    assert_eq!(r.volume_liters, -1.0);
    assert!(r.actions.is_empty());

    bench.echo_us.set(Some(ECHO_2_LITRES));
    open_lid(&bench, &mut ctl);
    bench.echo_us.set(None);
    let r = ctl.cycle();
    assert_eq!(r.actions, vec![LidAction::Closed(Trigger::Rain)]);
    let posts = bench.take_posts();
    assert_eq!(posts[0].1[0]["waterLevel"], json!(-1.0));
    assert_eq!(posts[2].1[0]["currentLevel"], json!(-1.0));
}

#[test]
fn override_open_when_closed() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.set_override("open");

    let r = ctl.cycle();
    assert!(!r.raining);
    assert_eq!(r.command, LidOverrideCommand::Open);
    assert_eq!(r.actions, vec![LidAction::Opened(Trigger::Override)]);
    assert_eq!(r.lid, LidState::OpenRaining);
    assert_eq!(bench.endpoints(), vec!["/api/lidStatusData"]);
    assert_eq!(*bench.steps.borrow(), vec![(Rotation::CounterClockwise, 155)]);
}

#[test]
fn override_close_when_open() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    open_lid(&bench, &mut ctl);

    bench.set_override("close");
    let r = ctl.cycle();
    assert!(r.raining);
    assert_eq!(r.actions, vec![LidAction::Closed(Trigger::Override)]);
    assert_eq!(
        bench.endpoints(),
        vec!["/api/tankData", "/api/lidStatusData", "/api/currentLevelData"]
    );
    assert_eq!(*bench.steps.borrow(), vec![(Rotation::Clockwise, 160)]);
}

#[test]
fn override_runs_after_rain_decision() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.rain_raw.set(WET);
    bench.set_override("close");

    let r = ctl.cycle();
    assert_eq!(
        r.actions,
        vec![
            LidAction::Opened(Trigger::Rain),
            LidAction::Closed(Trigger::Override)
        ]
    );
    assert_eq!(r.lid, LidState::ClosedDry);
}

#[test]
fn override_matching_state_is_ignored() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.set_override("close");
    assert!(ctl.cycle().actions.is_empty());

    bench.set_override("reset");
    open_lid(&bench, &mut ctl);
    bench.set_override("open");
    bench.rain_raw.set(WET);
    assert!(ctl.cycle().actions.is_empty());
}

#[test]
fn periodic_report_once_per_window() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);

    assert!(!ctl.cycle().periodic_report);
    clock.advance(Duration::from_secs(6 * 3_600));
    assert!(!ctl.cycle().periodic_report);
    clock.advance(Duration::from_secs(6 * 3_600));
    let r = ctl.cycle();
    assert!(r.periodic_report);
    let posts = bench.take_posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "https://smartdrop.uqcloud.net/api/tankData");
    assert_eq!(posts[0].1[0]["hours"], json!(-1));

    clock.advance(Duration::from_secs(300));
    assert!(!ctl.cycle().periodic_report);
    assert!(bench.posts.borrow().is_empty());
}

#[test]
fn periodic_report_fires_while_lid_is_open() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    open_lid(&bench, &mut ctl);

    bench.rain_raw.set(WET);
    clock.advance(Duration::from_secs(12 * 3_600));
    let r = ctl.cycle();
    assert!(r.periodic_report);
    assert!(r.actions.is_empty());
    assert_eq!(r.lid, LidState::OpenRaining);
    assert!(bench.steps.borrow().is_empty());

    let posts = bench.take_posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "https://smartdrop.uqcloud.net/api/tankData");
    assert_eq!(posts[0].1[0]["hours"], json!(-1));
}

#[test]
fn rejected_telemetry_does_not_stop_the_cycle() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.post_status.set(503);
    bench.rain_raw.set(WET);

    let r = ctl.cycle();
    assert_eq!(r.events_dropped, 1);
    assert_eq!(r.events_delivered, 0);
    assert_eq!(bench.posts.borrow().len(), 3);
    assert_eq!(r.lid, LidState::OpenRaining);
}

#[test]
fn run_cycles_sleeps_between_cycles() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    let reports = ctl.run_cycles(3);
    assert_eq!(reports.len(), 3);
    assert!(clock.elapsed() >= Duration::from_secs(600));
    assert!(clock.elapsed() < Duration::from_secs(601));
}

#[test]
fn diagnose_reads_everything_and_moves_nothing() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.set_override("open");
    bench.rain_raw.set(WET);

    let d = ctl.diagnose();
    assert!((d.volume_liters.unwrap() - 2.0).abs() < 0.01);
    assert!(d.rain.local);
    assert!(!d.rain.remote);
    assert_eq!(d.command, LidOverrideCommand::Open);
    assert!(bench.steps.borrow().is_empty());
    assert!(bench.posts.borrow().is_empty());
    assert_eq!(ctl.lid_state(), LidState::ClosedDry);
}

#[test]
fn diagnose_keeps_the_failed_sample() {
    let bench = Bench::new();
    let clock = ManualClock::starting_at(BOOT_UNIX);
    let mut ctl = controller(&bench, &clock);
    bench.echo_us.set(None);

    let d = ctl.diagnose();
    assert_eq!(d.volume_liters, None);
    assert_eq!(
        d.volume(),
        Err(LidError::SensingAggregate {
            failed_at: 1,
            samples: 20
        })
    );
    let v = serde_json::to_value(&d).unwrap();
    assert!(v["volume_liters"].is_null());
    assert!(v.get("volume_error").is_none());
}
