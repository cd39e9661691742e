//! Sensor byte ring
//!
//! Single-producer/single-consumer queue between the UART interrupt and the main loop.
//! The interrupt only ever enqueues through [`RxCapture`], the loop only ever dequeues
//! through the consumer half, so neither side needs a lock.
//!
//! Capacity is `SENSOR_RING_SIZE - 1` bytes (one slot is kept free by `heapless::spsc`),
//! just over one second of NMEA output at 9600 baud. That has to outlast the longest step
//! the loop blocks in while the sensor owns the line, which is an alarm burst.

use heapless::spsc::{Consumer, Producer, Queue};

pub const SENSOR_RING_SIZE: usize = 1024;

/// Bytes the ring can hold before the interrupt starts dropping.
pub const SENSOR_RING_CAPACITY: usize = SENSOR_RING_SIZE - 1;

pub type SensorRing = Queue<u8, SENSOR_RING_SIZE>;
pub type ByteProducer<'a> = Producer<'a, u8, SENSOR_RING_SIZE>;
pub type ByteConsumer<'a> = Consumer<'a, u8, SENSOR_RING_SIZE>;

/// Interrupt-side writer. Never blocks: bytes that do not fit are dropped and counted.
pub struct RxCapture<'a> {
    producer: ByteProducer<'a>,
    dropped: u32,
}

impl<'a> RxCapture<'a> {
    pub fn new(producer: ByteProducer<'a>) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Enqueues `bytes`, returning how many were dropped because the ring was full.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let mut dropped = 0;

        for &byte in bytes {
            if self.producer.enqueue(byte).is_err() {
                dropped += 1;
            }
        }

        self.dropped = self.dropped.wrapping_add(dropped as u32);
        dropped
    }

    /// Total bytes dropped since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
