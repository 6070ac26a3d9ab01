use oneliner_bridge::data::ArrayLengths;
use oneliner_bridge::native::simulated::SimProbe;
use oneliner_bridge::native::SimulatedEngine;
use oneliner_bridge::{Handle, Session};

mod concurrency;
mod cursors;
mod fault_flow;
mod model_edit;
mod open;

pub fn session_over(sim: SimulatedEngine) -> (Session, SimProbe) {
    let probe = sim.probe();
    (
        Session::with_engine(Box::new(sim), ArrayLengths::default()),
        probe,
    )
}

pub fn sample() -> (Session, SimProbe) {
    session_over(SimulatedEngine::sample())
}

pub fn nevada(session: &Session) -> Handle {
    session.find_bus_no(1).expect("sample has bus 1")
}
