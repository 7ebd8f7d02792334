//! Pipeline orchestration from ingress bytes to egress packets.
//!
//! ```text
//! socket/file -> synchronizer -> worker pool [lower MAC] -> in-order
//! consumer [upper MAC, LLC..SDS] -> egress FIFO -> UDP sender
//! ```
//!
//! The ingress thread owns the synchronizer and submits per-burst work with
//! a snapshot of the published cell state. The consumer thread owns all
//! upper-MAC state. A shared atomic flag fans termination out to every
//! stage; in-flight work always completes.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use num_complex::Complex;
use tetra_config::{ReceiverConfig, StreamKind};
use tetra_core::BurstType;
use tetra_pdus::umac::bsch::BroadcastSynchronizationChannel;

use crate::egress::{self, EgressItem, PacketSink, UdpJsonSink};
use crate::lmac::lower_mac::{LowerMac, LowerMacOutput};
use crate::pool::OrderedWorkerPool;
use crate::sync::bit_sync::BitSynchronizer;
use crate::sync::iq_sync::{IqSynchronizer, symbol_to_bits};
use crate::umac::upper_mac::{Counters, SharedCellState, UpperMac};

const RX_BUFFER_SIZE: usize = 4096;

/// Byte source feeding the pipeline.
enum Ingress {
    Socket(UdpSocket),
    File(File),
}

impl Ingress {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Ingress::Socket(socket) => match socket.recv(buf) {
                Ok(n) => Ok(n),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    Ok(0)
                }
                Err(e) => Err(e),
            },
            Ingress::File(file) => file.read(buf),
        }
    }
}

pub struct Decoder {
    config: ReceiverConfig,
}

impl Decoder {
    pub fn new(config: ReceiverConfig) -> Self {
        Decoder { config }
    }

    /// Run the pipeline until the source is exhausted or `termination` is
    /// set. Returns the consumer's counters.
    pub fn run(&self, termination: Arc<AtomicBool>) -> io::Result<Counters> {
        let sink: Box<dyn PacketSink> = Box::new(UdpJsonSink::new(self.config.send_port)?);
        self.run_with_sink(termination, sink)
    }

    pub fn run_with_sink(
        &self,
        termination: Arc<AtomicBool>,
        sink: Box<dyn PacketSink>,
    ) -> io::Result<Counters> {
        // cell state, optionally seeded for uplink-only operation
        let cell: SharedCellState = Arc::new(RwLock::new(
            self.config
                .uplink_scrambling_code
                .map(BroadcastSynchronizationChannel::with_scrambling_code),
        ));

        let lower_mac = Arc::new(LowerMac::new());
        let pool = Arc::new(OrderedWorkerPool::<LowerMacOutput>::new(self.config.num_workers));

        // egress FIFO and its sender thread
        let (egress_tx, egress_rx) = crossbeam_channel::unbounded::<EgressItem>();
        let station = uuid::Uuid::new_v4().to_string();
        let sender_handle =
            egress::spawn_sender(egress_rx, sink, Arc::clone(&termination), station);

        // in-order consumer thread
        let consumer_handle = {
            let pool = Arc::clone(&pool);
            let cell = Arc::clone(&cell);
            std::thread::Builder::new()
                .name("upper-mac".into())
                .spawn(move || {
                    let mut upper_mac = UpperMac::new(cell, egress_tx);
                    while let Some(output) = pool.pop() {
                        upper_mac.process(output);
                    }
                    upper_mac.counters()
                })
                .expect("failed to spawn upper mac consumer")
        };

        // ingress runs on this thread
        let ingress_result = self.ingress_loop(&termination, &cell, &lower_mac, &pool);

        // orderly shutdown: drain the pool, then the consumer, then the
        // sender
        termination.store(true, Ordering::Release);
        pool.shutdown();
        let counters = consumer_handle.join().expect("upper mac consumer panicked");
        let _ = sender_handle.join();

        tracing::info!(
            "pipeline finished: {} bursts, {} slots, {} packets, {} decode errors",
            counters.bursts_received,
            counters.slots_decoded,
            counters.packets_decoded,
            counters.decode_errors
        );

        ingress_result.map(|_| counters)
    }

    fn open_ingress(&self) -> io::Result<Ingress> {
        if let Some(path) = &self.config.input_file {
            return Ok(Ingress::File(File::open(path)?));
        }
        let socket = UdpSocket::bind(("127.0.0.1", self.config.receive_port))?;
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;
        Ok(Ingress::Socket(socket))
    }

    fn ingress_loop(
        &self,
        termination: &Arc<AtomicBool>,
        cell: &SharedCellState,
        lower_mac: &Arc<LowerMac>,
        pool: &Arc<OrderedWorkerPool<LowerMacOutput>>,
    ) -> io::Result<()> {
        let mut ingress = self.open_ingress()?;
        let mut record_file = match &self.config.output_file {
            Some(path) => Some(File::create(path)?),
            None => None,
        };

        let is_uplink = self.config.uplink_scrambling_code.is_some();
        let mut bit_sync = BitSynchronizer::new(is_uplink);
        let mut iq_sync = IqSynchronizer::new();
        // carries partial IQ symbols across read boundaries
        let mut iq_carry: Vec<u8> = Vec::new();

        let mut submit = |burst_type: BurstType, frame: Vec<u8>| {
            let lower_mac = Arc::clone(lower_mac);
            let snapshot = *cell.read().unwrap();
            pool.submit(move || lower_mac.process(&frame, burst_type, snapshot.as_ref()));
        };

        let mut rx_buffer = [0u8; RX_BUFFER_SIZE];
        while !termination.load(Ordering::Acquire) {
            let bytes_read = ingress.read(&mut rx_buffer)?;
            if bytes_read == 0 {
                match &ingress {
                    // a socket read timeout just re-checks termination
                    Ingress::Socket(_) => continue,
                    // end of the replay file ends the pipeline
                    Ingress::File(_) => break,
                }
            }
            let data = &rx_buffer[..bytes_read];

            if let Some(record) = record_file.as_mut() {
                record.write_all(data)?;
            }

            match self.config.stream {
                StreamKind::Iq => {
                    iq_carry.extend_from_slice(data);
                    let whole_symbols = iq_carry.len() / 8;
                    for chunk in iq_carry[..whole_symbols * 8].chunks_exact(8) {
                        let re = f32::from_le_bytes(chunk[0..4].try_into().unwrap());
                        let im = f32::from_le_bytes(chunk[4..8].try_into().unwrap());
                        let symbol = Complex::new(re, im);
                        if is_uplink {
                            iq_sync.process_symbol(symbol, &mut submit);
                        } else {
                            for bit in symbol_to_bits(symbol) {
                                bit_sync.process_bit(bit, &mut submit);
                            }
                        }
                    }
                    iq_carry.drain(..whole_symbols * 8);
                }
                StreamKind::Bits => {
                    for &byte in data {
                        if self.config.packed {
                            for j in 0..8 {
                                bit_sync.process_bit((byte >> j) & 0x1, &mut submit);
                            }
                        } else {
                            bit_sync.process_bit(byte & 0x1, &mut submit);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
