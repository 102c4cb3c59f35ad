// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taskflow status`: list running backend instances.

use crate::color::{codes, paint};
use tf_core::format_elapsed;
use tf_web::instances;

pub fn run() -> anyhow::Result<()> {
    let records = instances::list_live(&instances::default_registry_dir())?;
    if records.is_empty() {
        println!("no running backend instances");
        return Ok(());
    }

    println!(
        "{}",
        paint(codes::HEADER, "PID      PORT   UPTIME   WORKSPACE")
    );
    for record in records {
        println!(
            "{:<8} {:<6} {:<8} {}",
            record.pid,
            record.port,
            format_elapsed(record.uptime_secs()),
            record.workspace.display(),
        );
    }
    Ok(())
}
