//! Lane Rush entry point
//!
//! Native: runs a headless session driven by a simple autopilot and prints the
//! outcome as JSON. Web: exposes `start_session`/`stop_session` to the page.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_host {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use glam::Vec2;
    use serde::Deserialize;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

    use lane_rush::config::{Catalog, GameMode, SessionConfig};
    use lane_rush::consts::*;
    use lane_rush::{InputState, Session, SessionEnd, SessionOutcome, Tuning};

    use super::take_owned;

    /// Forwards the outcome to a page callback as a JSON string
    struct JsSink(js_sys::Function);

    impl SessionEnd for JsSink {
        fn on_session_end(&mut self, outcome: &SessionOutcome) {
            match serde_json::to_string(outcome) {
                Ok(json) => {
                    if let Err(e) = self.0.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                        log::error!("Session end callback failed: {:?}", e);
                    }
                }
                Err(e) => log::error!("Failed to encode outcome: {}", e),
            }
        }
    }

    /// Page-side session request
    #[derive(Debug, Deserialize)]
    struct HostConfig {
        mode: GameMode,
        #[serde(default = "default_index")]
        world: u8,
        #[serde(default = "default_index")]
        level: u8,
        players: Vec<HostPlayer>,
        #[serde(default)]
        tuning: Option<Tuning>,
    }

    #[derive(Debug, Deserialize)]
    struct HostPlayer {
        vehicle: String,
        driver: String,
    }

    fn default_index() -> u8 {
        1
    }

    type Shared = Rc<RefCell<Session<JsSink>>>;
    type Listener = (EventTarget, &'static str, Closure<dyn FnMut(web_sys::Event)>);
    type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

    /// Everything a running session registered with the browser.
    ///
    /// Dropping it removes every listener and cancels the pending frame.
    struct ScopedSession {
        listeners: Vec<Listener>,
        frame: FrameCallback,
        frame_id: Rc<Cell<Option<i32>>>,
    }

    impl Drop for ScopedSession {
        fn drop(&mut self) {
            for (target, kind, closure) in self.listeners.drain(..) {
                let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            }
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Some(id) = self.frame_id.take() {
                let _ = window.cancel_animation_frame(id);
            }
            // The frame callback may be the caller; free it on the next turn
            if let Some(frame) = self.frame.borrow_mut().take() {
                let release = Closure::once_into_js(move || drop(frame));
                let _ = window.set_timeout_with_callback(release.unchecked_ref());
            }
            log::info!("Session torn down");
        }
    }

    thread_local! {
        static ACTIVE: RefCell<Option<ScopedSession>> = const { RefCell::new(None) };
    }

    fn listen(
        listeners: &mut Vec<Listener>,
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        listeners.push((target.clone(), kind, closure));
        Ok(())
    }

    /// Client coordinates to playfield coordinates
    fn playfield_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Vec2 {
        let rect = canvas.get_bounding_client_rect();
        let sx = if rect.width() > 0.0 { PLAYFIELD_WIDTH as f64 / rect.width() } else { 1.0 };
        let sy = if rect.height() > 0.0 { PLAYFIELD_HEIGHT as f64 / rect.height() } else { 1.0 };
        Vec2::new(
            ((client_x as f64 - rect.left()) * sx) as f32,
            ((client_y as f64 - rect.top()) * sy) as f32,
        )
    }

    fn build_session(config_json: &str, seed: u64, on_end: js_sys::Function) -> Result<Session<JsSink>, String> {
        let host: HostConfig = serde_json::from_str(config_json).map_err(|e| e.to_string())?;
        let catalog = Catalog::builtin();
        let players = host
            .players
            .iter()
            .map(|p| catalog.setup(&p.vehicle, &p.driver))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        let config = SessionConfig {
            mode: host.mode,
            world: host.world,
            level: host.level,
            players,
        };
        Session::new(config, host.tuning.unwrap_or_default(), seed, JsSink(on_end)).map_err(|e| e.to_string())
    }

    fn register_input(session: &Shared, canvas: Option<&HtmlCanvasElement>) -> Result<Vec<Listener>, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let mut listeners = Vec::new();

        {
            let session = session.clone();
            listen(&mut listeners, &window, "keydown", move |event| {
                if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                    if session.borrow_mut().input_mut().key_down(&key.key()) {
                        event.prevent_default();
                    }
                }
            })?;
        }
        {
            let session = session.clone();
            listen(&mut listeners, &window, "keyup", move |event| {
                if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                    session.borrow_mut().input_mut().key_up(&key.key());
                }
            })?;
        }
        {
            let session = session.clone();
            listen(&mut listeners, &window, "blur", move |_event| {
                session.borrow_mut().input_mut().release_all();
            })?;
        }

        let Some(canvas) = canvas else {
            return Ok(listeners);
        };

        // Mouse drag
        {
            let session = session.clone();
            let canvas_ref = canvas.clone();
            listen(&mut listeners, canvas, "mousedown", move |event| {
                if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                    let at = playfield_point(&canvas_ref, mouse.client_x(), mouse.client_y());
                    session.borrow_mut().pointer_down(at);
                }
            })?;
        }
        {
            let session = session.clone();
            let canvas_ref = canvas.clone();
            listen(&mut listeners, canvas, "mousemove", move |event| {
                if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                    let at = playfield_point(&canvas_ref, mouse.client_x(), mouse.client_y());
                    session.borrow_mut().input_mut().pointer_move(at.y);
                }
            })?;
        }
        {
            let session = session.clone();
            listen(&mut listeners, &window, "mouseup", move |_event| {
                session.borrow_mut().input_mut().pointer_up();
            })?;
        }

        // Touch drag
        {
            let session = session.clone();
            let canvas_ref = canvas.clone();
            listen(&mut listeners, canvas, "touchstart", move |event| {
                if let Some(touch) = event.dyn_ref::<TouchEvent>().and_then(|t| t.touches().get(0)) {
                    let at = playfield_point(&canvas_ref, touch.client_x(), touch.client_y());
                    if session.borrow_mut().pointer_down(at) {
                        event.prevent_default();
                    }
                }
            })?;
        }
        {
            let session = session.clone();
            let canvas_ref = canvas.clone();
            listen(&mut listeners, canvas, "touchmove", move |event| {
                if let Some(touch) = event.dyn_ref::<TouchEvent>().and_then(|t| t.touches().get(0)) {
                    let mut s = session.borrow_mut();
                    if s.input_mut().is_dragging() {
                        event.prevent_default();
                        let at = playfield_point(&canvas_ref, touch.client_x(), touch.client_y());
                        s.input_mut().pointer_move(at.y);
                    }
                }
            })?;
        }
        {
            let session = session.clone();
            listen(&mut listeners, canvas, "touchend", move |_event| {
                session.borrow_mut().input_mut().pointer_up();
            })?;
        }

        Ok(listeners)
    }

    fn request_frame(window: &web_sys::Window, frame: &FrameCallback) -> Option<i32> {
        let frame = frame.borrow();
        let callback = frame.as_ref()?;
        window.request_animation_frame(callback.as_ref().unchecked_ref()).ok()
    }

    /// Start a session, replacing any running one.
    ///
    /// `on_end` receives the outcome JSON once; the session tears itself down
    /// after the exit animation.
    #[wasm_bindgen]
    pub fn start_session(config_json: &str, seed: f64, on_end: js_sys::Function) -> Result<(), JsValue> {
        stop_session();

        let session = build_session(config_json, seed as u64, on_end).map_err(|e| JsValue::from_str(&e))?;
        let session: Shared = Rc::new(RefCell::new(session));

        let window = web_sys::window().ok_or("no window")?;
        let canvas = window
            .document()
            .and_then(|d| d.get_element_by_id("canvas"))
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok());

        let listeners = register_input(&session, canvas.as_ref())?;

        let frame: FrameCallback = Rc::new(RefCell::new(None));
        let frame_id = Rc::new(Cell::new(None));
        {
            let session = session.clone();
            let next = frame.clone();
            let frame_id = frame_id.clone();
            let last_time = Cell::new(None::<f64>);
            *frame.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |time: f64| {
                let dt = last_time
                    .replace(Some(time))
                    .map_or(FRAME_MS, |prev| (time - prev) as f32);

                let settled = {
                    let mut s = session.borrow_mut();
                    s.advance(dt);
                    s.is_settled()
                };
                if settled {
                    frame_id.set(None);
                    // on_end may already have started a replacement session
                    let guard = ACTIVE.with(|active| {
                        take_owned(&mut active.borrow_mut(), |g| Rc::ptr_eq(&g.frame, &next))
                    });
                    drop(guard);
                    return;
                }
                if let Some(window) = web_sys::window() {
                    frame_id.set(request_frame(&window, &next));
                }
            }));
        }
        frame_id.set(request_frame(&window, &frame));

        ACTIVE.with(|active| {
            *active.borrow_mut() = Some(ScopedSession {
                listeners,
                frame,
                frame_id,
            });
        });
        Ok(())
    }

    /// Stop the running session, if any. Safe to call repeatedly.
    #[wasm_bindgen]
    pub fn stop_session() {
        let guard = ACTIVE.with(|active| active.borrow_mut().take());
        drop(guard);
    }

    /// Keyboard scheme, for the page's help overlay
    #[wasm_bindgen]
    pub fn is_bound_key(key: &str) -> bool {
        InputState::is_bound(key)
    }
}

/// Take the value out of `slot` only if `owns` recognises it
#[cfg(any(target_arch = "wasm32", test))]
fn take_owned<T>(slot: &mut Option<T>, owns: impl FnOnce(&T) -> bool) -> Option<T> {
    if slot.as_ref().is_some_and(owns) { slot.take() } else { None }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Lane Rush loaded");
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use anyhow::{Context, bail};
    use clap::Parser;

    use lane_rush::config::{Catalog, GameMode, SessionConfig};
    use lane_rush::consts::*;
    use lane_rush::input::{P1_KEYS, P2_KEYS};
    use lane_rush::sim::{GameState, Slot};
    use lane_rush::{InputState, Session, SessionOutcome, Tuning};

    /// Headless Lane Rush session driven by a simple autopilot
    #[derive(Debug, Parser)]
    #[command(name = "lane-rush", version, about)]
    struct Options {
        /// Game mode: infinite, levels or race
        #[arg(long, default_value = "levels", value_parser = parse_mode)]
        mode: GameMode,
        #[arg(long, default_value_t = 1)]
        world: u8,
        #[arg(long, default_value_t = 1)]
        level: u8,
        #[arg(long, default_value = "basic")]
        vehicle: String,
        #[arg(long, default_value = "rookie")]
        driver: String,
        /// Second player as VEHICLE:DRIVER (race mode)
        #[arg(long, value_parser = parse_setup)]
        versus: Option<(String, String)>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Give up after this many simulated seconds
        #[arg(long, default_value_t = 300.0)]
        seconds: f32,
        /// JSON file overriding balance values
        #[arg(long)]
        tuning: Option<String>,
    }

    fn parse_mode(value: &str) -> Result<GameMode, String> {
        GameMode::parse(value).ok_or_else(|| format!("unknown mode '{value}'"))
    }

    fn parse_setup(value: &str) -> Result<(String, String), String> {
        value
            .split_once(':')
            .map(|(v, d)| (v.to_string(), d.to_string()))
            .ok_or_else(|| format!("expected VEHICLE:DRIVER, got '{value}'"))
    }

    /// Steer away from traffic ahead in the same lane; fire the ability when threatened
    fn autopilot(state: &GameState, slot: Slot, input: &mut InputState) {
        let [up, down, action] = match slot {
            Slot::One => P1_KEYS,
            Slot::Two => P2_KEYS,
        };
        let Some(me) = state.player(slot) else {
            return;
        };
        let rect = me.rect();

        let threat = state
            .traffic
            .iter()
            .map(|t| t.rect())
            .chain(state.rivals.iter().map(|r| r.rect()))
            .filter(|r| r.min.x + r.size.x > rect.min.x && r.min.x < rect.max().x + 250.0)
            .filter(|r| r.min.y < rect.max().y + 10.0 && r.max().y > rect.min.y - 10.0)
            .min_by(|a, b| a.min.x.total_cmp(&b.min.x));

        input.key_up(up);
        input.key_up(down);
        input.key_up(action);

        if let Some(r) = threat {
            let dodge_up = (r.center().y > rect.center().y && rect.min.y > TRACK_MARGIN + 5.0)
                || rect.max().y >= PLAYFIELD_HEIGHT - TRACK_MARGIN - 5.0;
            input.key_down(if dodge_up { up } else { down });
            if me.ability_ready() {
                input.key_down(action);
            }
        } else if me.health < MAX_HEALTH && me.ability_ready() {
            input.key_down(action);
        }
    }

    pub fn run() -> anyhow::Result<SessionOutcome> {
        let opts = Options::parse();
        let catalog = Catalog::builtin();

        let mut players = vec![catalog.setup(&opts.vehicle, &opts.driver)?];
        if let Some((v, d)) = &opts.versus {
            players.push(catalog.setup(v, d)?);
        }
        let config = SessionConfig {
            mode: opts.mode,
            world: opts.world,
            level: opts.level,
            players,
        };
        let tuning = match &opts.tuning {
            Some(path) => {
                let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
                Tuning::from_json(&json).with_context(|| format!("parsing {path}"))?
            }
            None => Tuning::default(),
        };

        let mut reported = None;
        let mut session = Session::new(config, tuning, opts.seed, |o: &SessionOutcome| {
            reported = Some(o.clone());
        })?;

        let frames = (opts.seconds * 1000.0 / FRAME_MS).ceil() as u64;
        for _ in 0..frames {
            let slots = session.state().players.len();
            for i in 0..slots {
                let (state, input) = session.state_and_input();
                autopilot(state, Slot::from_index(i), input);
            }
            session.advance(FRAME_MS);
            if session.is_settled() {
                break;
            }
        }

        let state = session.state();
        log::info!(
            "Simulated {} ticks, distance {:.1}, coins {}",
            state.time_ticks,
            state.leader_distance(),
            state.session_coins
        );
        let finished = session.is_finished();
        drop(session);

        match reported {
            Some(outcome) => Ok(outcome),
            None if !finished => bail!("time limit reached before the session ended"),
            None => bail!("session finished without an outcome"),
        }
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Lane Rush (native, headless) starting...");

    match native::run() {
        Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to encode outcome: {}", e),
        },
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
