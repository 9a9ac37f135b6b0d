// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Stands in for the (out-of-scope) resource master connection: a newline-delimited JSON
//! `Offer` per line, one offer per `process_offer` call. Not a wire protocol this program
//! is trying to be faithful to -- just a socket simple enough to drive the pipeline from
//! the outside for real operation and for integration tests.

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use launchpad_common::model::Offer;
use launchpad_kernel::AppScheduler;
use tracing::{debug, info, warn};

pub fn spawn(
    listen_addr: String,
    scheduler: Arc<AppScheduler>,
    kill_switch: Arc<AtomicBool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let listener = TcpListener::bind(&listen_addr)?;
    listener.set_nonblocking(true)?;
    info!(addr = listen_addr, "offer listener bound");

    Ok(std::thread::Builder::new()
        .name("offer-listener".to_string())
        .spawn(move || accept_loop(listener, scheduler, kill_switch))
        .expect("failed to spawn offer-listener thread"))
}

fn accept_loop(listener: TcpListener, scheduler: Arc<AppScheduler>, kill_switch: Arc<AtomicBool>) {
    loop {
        if kill_switch.load(Ordering::Relaxed) {
            info!("offer listener shutting down");
            return;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(?peer, "offer-ingestion connection accepted");
                let scheduler = scheduler.clone();
                let kill_switch = kill_switch.clone();
                std::thread::Builder::new()
                    .name("offer-conn".to_string())
                    .spawn(move || handle_connection(stream, scheduler, kill_switch))
                    .ok();
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "offer listener accept failed");
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }
    }
}

fn handle_connection(stream: TcpStream, scheduler: Arc<AppScheduler>, kill_switch: Arc<AtomicBool>) {
    let _ = stream.set_nonblocking(false);
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        if kill_switch.load(Ordering::Relaxed) {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "offer connection read failed");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Offer>(&line) {
            Ok(offer) => {
                debug!(offer_id = offer.id, "offer received");
                scheduler.process_offer(offer);
            }
            Err(e) => {
                warn!(error = %e, "failed to parse offer, dropping line");
            }
        }
    }
}
