/// requestAnimationFrame-driven loop around an [`IsoEngine`]
use std::cell::RefCell;
use std::rc::Rc;

use isoflow_core::AnimationLoop;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::{FrameView, IsoEngine};

struct LoopState {
    engine: IsoEngine,
    frames: AnimationLoop<i32>,
    tick: Option<Closure<dyn FnMut(f64)>>,
}

/// Owns an engine and calls `on_frame(FrameView)` once per animation frame
/// while running.
#[wasm_bindgen]
pub struct FrameLoop {
    state: Rc<RefCell<LoopState>>,
}

fn schedule(state: &Rc<RefCell<LoopState>>) {
    let mut s = state.borrow_mut();
    if !s.frames.is_running() {
        return;
    }
    let Some(window) = web::window() else {
        log::error!("no window to schedule frames on");
        return;
    };
    let Some(tick) = s.tick.as_ref() else {
        return;
    };
    match window.request_animation_frame(tick.as_ref().unchecked_ref()) {
        Ok(handle) => {
            s.frames.scheduled(handle);
        }
        Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
    }
}

#[wasm_bindgen]
impl FrameLoop {
    #[wasm_bindgen(constructor)]
    pub fn new(engine: IsoEngine, on_frame: js_sys::Function) -> FrameLoop {
        let state = Rc::new(RefCell::new(LoopState {
            engine,
            frames: AnimationLoop::new(),
            tick: None,
        }));

        let tick_state = Rc::clone(&state);
        let tick = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let now = timestamp_ms / 1000.0;
            // Release the borrow before calling out; the callback may stop the loop.
            let frame = {
                let mut s = tick_state.borrow_mut();
                if s.frames.begin_frame(now).is_none() {
                    return;
                }
                s.engine.frame_at(now)
            };
            let view: JsValue = FrameView { frame }.into();
            if let Err(e) = on_frame.call1(&JsValue::NULL, &view) {
                log::error!("frame callback threw: {:?}", e);
            }
            schedule(&tick_state);
        }) as Box<dyn FnMut(f64)>);
        state.borrow_mut().tick = Some(tick);

        FrameLoop { state }
    }

    pub fn start(&self) {
        let started = self.state.borrow_mut().frames.start();
        if started {
            log::info!("frame loop started");
            schedule(&self.state);
        }
    }

    /// Stop and cancel the pending frame. Safe to call repeatedly.
    pub fn stop(&self) {
        self.state.borrow_mut().frames.stop(|handle| {
            if let Some(window) = web::window() {
                if let Err(e) = window.cancel_animation_frame(handle) {
                    log::warn!("cancelAnimationFrame failed: {:?}", e);
                }
            }
        });
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.state.borrow().frames.is_running()
    }

    /// Forwarded angle change; the next frame reads it.
    #[wasm_bindgen(js_name = setAngles)]
    pub fn set_angles(&self, rotate_x: f64, rotate_z: f64, perspective: f64) {
        self.state
            .borrow_mut()
            .engine
            .set_angles(rotate_x, rotate_z, perspective);
    }

    #[wasm_bindgen(js_name = moveBox)]
    pub fn move_box(&self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsError> {
        self.state.borrow_mut().engine.move_box(id, x, y, z)
    }

    #[wasm_bindgen(js_name = setAxisOrder)]
    pub fn set_axis_order(&self, connector_id: &str, axis_order: &str) -> bool {
        self.state
            .borrow_mut()
            .engine
            .set_axis_order(connector_id, axis_order)
    }
}
