use defmt::Format;

/// Device currently allowed to talk on the shared transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum ChannelOwner {
    Sensor,
    Modem,
}

/// Hardware side of the transport switch: routes the shared line to one device.
pub trait ChannelSelect {
    fn select(&mut self, owner: ChannelOwner);
}

/// Raw operations on a muxed serial line.
pub trait LineControl {
    /// Points the mux at `owner`.
    fn route(&mut self, owner: ChannelOwner);

    /// Throws away received bytes that have not been captured yet.
    fn discard_pending(&mut self);

    /// Turns interrupt-driven capture of received bytes on or off.
    fn capture(&mut self, enabled: bool);
}

/// [`ChannelSelect`] over a [`LineControl`] that only touches the line when the route
/// changes. Re-selecting the current owner leaves pending bytes alone.
pub struct Mux<L> {
    line: L,
    route: Option<ChannelOwner>,
}

impl<L: LineControl> Mux<L> {
    pub fn new(line: L) -> Self {
        Self { line, route: None }
    }

    pub fn route(&self) -> Option<ChannelOwner> {
        self.route
    }
}

impl<L: LineControl> ChannelSelect for Mux<L> {
    fn select(&mut self, owner: ChannelOwner) {
        if self.route == Some(owner) {
            return;
        }

        self.line.capture(false);
        self.line.route(owner);
        // Whatever arrived before the switch belongs to the previous device
        self.line.discard_pending();

        if owner == ChannelOwner::Sensor {
            self.line.capture(true);
        }
        self.route = Some(owner);
    }
}

/// Grants the shared half-duplex transport to one device at a time.
///
/// Acquiring for one device implicitly releases the other. There is no queue and no
/// waiting: `acquire` always succeeds and always reaches the hardware, even when the
/// requested device already owns the line.
pub struct Arbiter<X: ChannelSelect> {
    select: X,
    owner: ChannelOwner,
    switches: u32,
}

impl<X: ChannelSelect> Arbiter<X> {
    /// Routes the line to the sensor, which owns it whenever the loop is not talking to
    /// the modem.
    pub fn new(mut select: X) -> Self {
        select.select(ChannelOwner::Sensor);

        Self {
            select,
            owner: ChannelOwner::Sensor,
            switches: 0,
        }
    }

    pub fn acquire(&mut self, device: ChannelOwner) {
        if self.owner != device {
            self.switches = self.switches.wrapping_add(1);
            crate::log_trace!(
                "channel: {:?} -> {:?} (switch {})",
                self.owner,
                device,
                self.switches
            );
        }

        self.select.select(device);
        self.owner = device;
    }

    pub fn owner(&self) -> ChannelOwner {
        self.owner
    }

    /// Number of ownership changes since start-up.
    pub fn switches(&self) -> u32 {
        self.switches
    }
}
