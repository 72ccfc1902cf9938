use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    for profile in [
        TranscriptProfile::Boot,
        TranscriptProfile::Discharge,
        TranscriptProfile::Handover,
    ] {
        record_profile(profile)?;
        println!("wrote {}", profile.log_path());
    }
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let script: &[&str] = match profile {
        TranscriptProfile::Boot => &[
            // Switch already closed at power-up: stays uninitialized.
            "switch on",
            "run 300",
            "status",
            "switch off",
            "run 600",
            "switch on",
            "step",
            "status",
        ],
        TranscriptProfile::Discharge => &[
            "step",
            "switch on",
            "discharge allow",
            "run 4000 cycle=5",
            "status",
            "discharge inhibit",
            "run 1000",
            "switch off",
            "step",
            "events",
        ],
        TranscriptProfile::Handover => &[
            "step",
            "switch on",
            "charge allow",
            "run 100",
            "select external",
            "step",
            "status",
            "charge inhibit",
            "select mppt",
            "run 10",
            "charge allow",
            "step",
            "events",
        ],
    };

    for command in script {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
