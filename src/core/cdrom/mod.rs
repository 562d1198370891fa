pub mod disc;

use crate::core::cdrom::disc::{CdImage, LEAD_IN_FRAMES, SECTOR_RAW_SIZE};
use crate::core::CPU_CLOCK;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/*
Register file, selected by the index written to bits 0..1 of 1F801800h:

Read:
 Bank   1F801800  1F801801  1F801802  1F801803
 0,2    HSTS      RESULT    RDDATA    HINTMSK
 1,3    HSTS      RESULT    RDDATA    HINTSTS
Write:
 Bank   1F801800  1F801801  1F801802  1F801803
 0      INDEX     COMMAND   PARAMETER REQUEST
 1      INDEX     WRDATA    HINTMSK   HCLRCTL
 2      INDEX     CI        ATV0      ATV1
 3      INDEX     ATV2      ATV3      ADPCTL
 */

const PARAMETER_FIFO_LEN: usize = 16;
const DATA_FIFO_LEN: usize = 0x924;

const WHOLE_SECTOR_SIZE: usize = 0x924;
const DATA_SECTOR_SIZE: usize = 0x800;
/// Offset of the 800h-byte payload inside a raw Mode 2 sector.
const DATA_SECTOR_SKIP: u64 = 24;

/// Most commands acknowledge after roughly this many CPU cycles.
pub const FIRST_RESPONSE_DELAY: u64 = 16000;
const GET_ID_SECOND_DELAY: u64 = 0x4A00;
const STD_SECOND_DELAY: u64 = 0x4A73;
const INIT_SECOND_DELAY: u64 = 0x13CCE;
const READ_TOC_SECOND_DELAY: u64 = CPU_CLOCK as u64 / 60;

/*
19h,20h --> INT3(yy,mm,dd,ver): HC05 controller BIOS date and version.
94h,11h,18h,C0h is the late-1994 PU-7 firmware.
 */
const CONTROLLER_VERSION: [u8; 4] = [0x94, 0x11, 0x18, 0xC0];

/// GetID tail for a licensed Mode 2 disc; the last byte carries the SCEx
/// region letter.
const LICENSED_RESPONSE_PREFIX: [u8; 7] = [0x02, 0x00, 0x20, 0x00, b'S', b'C', b'E'];

/*
SxPx - Japan (NTSC)
SxEx - Europe (PAL)
SxUx - USA (NTSC)
 */
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Region {
    Japan,
    USA,
    Europe,
}

impl Region {
    pub fn to_scee_letter(&self) -> char {
        match self {
            Region::Japan => 'I',
            Region::USA => 'A',
            Region::Europe => 'E',
        }
    }
}

/// The boot licence text lives in the user data of system-area sector 4;
/// its trailing words name the region (with the odd spacing the mastering
/// plants put there, hence the short tokens).
fn detect_region(disc: &dyn CdImage) -> Region {
    let base = (LEAD_IN_FRAMES + 4) * SECTOR_RAW_SIZE + DATA_SECTOR_SKIP;
    let mut text = [0u8; 132];
    for (i, byte) in text.iter_mut().enumerate() {
        *byte = disc.read_byte(base + i as u64);
    }
    if text.windows(4).any(|w| w == b"Amer") {
        Region::USA
    } else if text.windows(4).any(|w| w == b"Euro") {
        Region::Europe
    } else if text.windows(4).any(|w| w == b"Inc.") {
        Region::Japan
    } else {
        // unreadable system area, assume the PAL drive we model
        Region::Europe
    }
}

#[derive(Debug, Clone, Copy)]
enum CdromInt {
    // data ready
    Int1 = 1,
    // command completed
    Int2 = 2,
    // command acknowledged
    Int3 = 3,
    // command or read error
    Int5 = 5,
}

// stat bit 7 would be Play; this drive only reads data tracks
#[derive(Debug, Clone, Copy, PartialEq)]
enum DriveState {
    Idle = 0x00,
    Read = 0x20,
    Seek = 0x40,
}

/// Work left to do once the current interrupt has been acknowledged.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SecondPhase {
    GetId,
    Pause,
    Init,
    SeekL,
    ReadSector,
    ReadToc,
}

pub struct CdromDrive {
    index: usize,
    parameter_fifo: VecDeque<u8>,
    response_fifo: VecDeque<u8>,
    data_fifo: VecDeque<u8>,
    sector_buffer: Vec<u8>,
    hintmsk: u8,
    hintsts: u8,
    pending_irq: u8,
    second_phase: Option<SecondPhase>,
    state: DriveState,
    motor_on: bool,
    busy: bool,
    mode: u8,
    setloc_position: u64,
    atv: [u8; 4],
    region: Region,
    disc: Option<Box<dyn CdImage>>,
}

impl CdromDrive {
    pub fn new(disc: Option<Box<dyn CdImage>>) -> Self {
        let region = disc.as_deref().map(detect_region).unwrap_or(Region::Europe);
        if disc.is_some() {
            info!("CDROM drive loaded with a disc image, region {:?}", region);
        }
        CdromDrive {
            index: 0,
            parameter_fifo: VecDeque::with_capacity(PARAMETER_FIFO_LEN),
            response_fifo: VecDeque::with_capacity(16),
            data_fifo: VecDeque::with_capacity(DATA_FIFO_LEN),
            sector_buffer: Vec::new(),
            hintmsk: 0,
            hintsts: 0,
            pending_irq: 0,
            second_phase: None,
            state: DriveState::Idle,
            motor_on: true,
            busy: false,
            mode: 0,
            setloc_position: 0,
            atv: [0; 4],
            region,
            disc,
        }
    }

    pub fn setloc_position(&self) -> u64 {
        self.setloc_position
    }

    /*
    HSTS:
      0-1 RA       Current register bank
      3   PRMEMPT  Parameter FIFO empty
      4   PRMWRDY  Parameter FIFO not full
      5   RSLRRDY  Result FIFO not empty
      6   DRQSTS   Data request pending
      7   BUSYSTS  HC05 busy acknowledging a command
     */
    pub fn read_port0(&self) -> u8 {
        let mut hsts = self.index as u8;
        if self.parameter_fifo.is_empty() {
            hsts |= 1 << 3;
        }
        if self.parameter_fifo.len() < PARAMETER_FIFO_LEN {
            hsts |= 1 << 4;
        }
        if !self.response_fifo.is_empty() {
            hsts |= 1 << 5;
        }
        if !self.data_fifo.is_empty() {
            hsts |= 1 << 6;
        }
        if self.busy {
            hsts |= 1 << 7;
        }
        hsts
    }

    pub fn write_port0(&mut self, value: u8) {
        self.index = (value & 3) as usize;
    }

    pub fn read_port1(&mut self) -> u8 {
        self.response_fifo.pop_front().unwrap_or(0)
    }

    pub fn read_port2(&mut self) -> u8 {
        self.data_fifo.pop_front().unwrap_or(0)
    }

    pub fn read_port3(&self) -> u8 {
        // undriven upper bits read back high
        match self.index {
            0 | 2 => self.hintmsk | 0xE0,
            _ => self.hintsts | 0xE0,
        }
    }

    /// Returns the cycle delay of a freshly scheduled interrupt, if the
    /// write started one.
    pub fn write_port1(&mut self, value: u8) -> Option<u64> {
        match self.index {
            0 => self.dispatch_command(value),
            1 => {
                debug!("CDROM WRDATA {:02X} ignored", value);
                None
            }
            2 => {
                self.atv[0] = value;
                None
            }
            _ => {
                self.atv[2] = value;
                None
            }
        }
    }

    pub fn write_port2(&mut self, value: u8) -> Option<u64> {
        match self.index {
            0 => {
                if self.parameter_fifo.len() < PARAMETER_FIFO_LEN {
                    self.parameter_fifo.push_back(value);
                }
                None
            }
            1 => {
                self.hintmsk = value & 0x1F;
                None
            }
            2 => {
                self.atv[1] = value;
                None
            }
            _ => {
                self.atv[3] = value;
                None
            }
        }
    }

    pub fn write_port3(&mut self, value: u8) -> Option<u64> {
        match self.index {
            0 => {
                // REQUEST: BFRD loads the data FIFO from the sector buffer
                if (value & 0x80) != 0 {
                    self.load_data_fifo();
                } else {
                    self.data_fifo.clear();
                }
                None
            }
            1 => self.acknowledge(value),
            2 => {
                self.atv[2] = value;
                None
            }
            _ => {
                // ADPCTL bit 5 latches the ATV pending volumes
                if (value & 0x20) != 0 {
                    debug!("CDROM applying volumes {:02X?}", self.atv);
                }
                None
            }
        }
    }

    /// HCLRCTL write: drops acknowledged interrupt bits, and once the
    /// line is clear hands out the delay of any queued second response.
    fn acknowledge(&mut self, value: u8) -> Option<u64> {
        self.hintsts &= !(value & 0x1F);
        if (value & 0x40) != 0 {
            self.parameter_fifo.clear();
        }
        if (self.hintsts & 7) == 0 {
            if let Some(phase) = self.second_phase.take() {
                return Some(self.run_second_phase(phase));
            }
        }
        None
    }

    /// Delayed-IRQ maturity: latch the interrupt number into HINTSTS.
    pub fn on_delayed_irq(&mut self) {
        self.busy = false;
        self.hintsts = (self.hintsts & !7) | (self.pending_irq & 7);
    }

    /// Word access used by DMA channel 3.
    pub fn dma_read_word(&mut self) -> u32 {
        u32::from_le_bytes([
            self.data_fifo.pop_front().unwrap_or(0),
            self.data_fifo.pop_front().unwrap_or(0),
            self.data_fifo.pop_front().unwrap_or(0),
            self.data_fifo.pop_front().unwrap_or(0),
        ])
    }

    fn stat(&self) -> u8 {
        let mut stat = self.state as u8;
        if self.motor_on {
            stat |= 0x02;
        }
        if self.disc.is_none() {
            // lid reads open without a disc, which also fails GetID
            stat |= 0x10;
        }
        stat
    }

    fn respond(&mut self, int: CdromInt, bytes: &[u8]) {
        self.pending_irq = int as u8;
        for byte in bytes {
            self.response_fifo.push_back(*byte);
        }
        self.busy = true;
    }

    fn dispatch_command(&mut self, command: u8) -> Option<u64> {
        debug!("CDROM command {:02X}", command);
        self.response_fifo.clear();
        let delay = match command {
            0x01 => self.command_getstat(),
            0x02 => self.command_setloc(),
            0x06 => self.command_readn(),
            0x09 => self.command_pause(),
            0x0A => self.command_init(),
            0x0C => self.command_demute(),
            0x0E => self.command_setmode(),
            0x15 => self.command_seekl(),
            0x19 => self.command_test(),
            0x1A => self.command_getid(),
            0x1E => self.command_readtoc(),
            _ => {
                warn!("CDROM unknown command {:02X}", command);
                None
            }
        };
        self.parameter_fifo.clear();
        delay
    }

    fn command_getstat(&mut self) -> Option<u64> {
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        Some(FIRST_RESPONSE_DELAY)
    }

    /// BCD minute/second/frame to an absolute byte position.
    fn command_setloc(&mut self) -> Option<u64> {
        let minute = bcd_to_binary(self.parameter_fifo.pop_front().unwrap_or(0)) as u64;
        let second = bcd_to_binary(self.parameter_fifo.pop_front().unwrap_or(0)) as u64;
        let frame = bcd_to_binary(self.parameter_fifo.pop_front().unwrap_or(0)) as u64;
        self.setloc_position = (minute * 60 * 75 + second * 75 + frame) * SECTOR_RAW_SIZE;
        debug!(
            "CDROM setloc {:02}:{:02}:{:02} -> {}",
            minute, second, frame, self.setloc_position
        );
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_readn(&mut self) -> Option<u64> {
        self.state = DriveState::Read;
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.second_phase = Some(SecondPhase::ReadSector);
        Some(FIRST_RESPONSE_DELAY)
    }

    /// Whether we were reading or playing is not distinguished here; both
    /// collapse to the same idle transition.
    fn command_pause(&mut self) -> Option<u64> {
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.state = DriveState::Idle;
        self.second_phase = Some(SecondPhase::Pause);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_init(&mut self) -> Option<u64> {
        self.mode = 0;
        self.motor_on = true;
        self.state = DriveState::Idle;
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.second_phase = Some(SecondPhase::Init);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_demute(&mut self) -> Option<u64> {
        debug!("CDROM demute");
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        Some(FIRST_RESPONSE_DELAY)
    }

    /*
    Setmode:
      0   CDDA sectors allowed
      1   Auto pause at track end
      2   Report interrupts for audio play
      3   XA filter enable
      4   Ignore bit
      5   Whole sector (924h bytes instead of 800h)
      6   XA-ADPCM enable
      7   Double speed
     */
    fn command_setmode(&mut self) -> Option<u64> {
        self.mode = self.parameter_fifo.pop_front().unwrap_or(0);
        debug!("CDROM mode = {:02X}", self.mode);
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_seekl(&mut self) -> Option<u64> {
        self.state = DriveState::Seek;
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.second_phase = Some(SecondPhase::SeekL);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_test(&mut self) -> Option<u64> {
        let sub = self.parameter_fifo.pop_front().unwrap_or(0);
        match sub {
            0x20 => {
                self.respond(CdromInt::Int3, &CONTROLLER_VERSION);
                Some(FIRST_RESPONSE_DELAY)
            }
            _ => {
                warn!("CDROM unknown test sub-command {:02X}", sub);
                let stat = self.stat() | 0x01;
                self.respond(CdromInt::Int5, &[stat, 0x10]);
                Some(FIRST_RESPONSE_DELAY)
            }
        }
    }

    fn command_getid(&mut self) -> Option<u64> {
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.second_phase = Some(SecondPhase::GetId);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn command_readtoc(&mut self) -> Option<u64> {
        let stat = self.stat();
        self.respond(CdromInt::Int3, &[stat]);
        self.second_phase = Some(SecondPhase::ReadToc);
        Some(FIRST_RESPONSE_DELAY)
    }

    fn run_second_phase(&mut self, phase: SecondPhase) -> u64 {
        match phase {
            SecondPhase::GetId => {
                if self.disc.is_some() {
                    let mut response = [0u8; 8];
                    response[..7].copy_from_slice(&LICENSED_RESPONSE_PREFIX);
                    response[7] = self.region.to_scee_letter() as u8;
                    self.respond(CdromInt::Int2, &response);
                } else {
                    self.respond(CdromInt::Int5, &[0x08, 0x40, 0, 0, 0, 0, 0, 0]);
                }
                GET_ID_SECOND_DELAY
            }
            SecondPhase::Pause | SecondPhase::SeekL => {
                self.state = DriveState::Idle;
                let stat = self.stat();
                self.respond(CdromInt::Int2, &[stat]);
                STD_SECOND_DELAY
            }
            SecondPhase::Init => {
                let stat = self.stat();
                self.respond(CdromInt::Int2, &[stat]);
                INIT_SECOND_DELAY
            }
            SecondPhase::ReadToc => {
                let stat = self.stat();
                self.respond(CdromInt::Int2, &[stat]);
                READ_TOC_SECOND_DELAY
            }
            SecondPhase::ReadSector => {
                self.read_sector();
                let stat = self.stat();
                self.respond(CdromInt::Int1, &[stat]);
                // keep streaming until Pause or Init replaces the phase
                if self.state == DriveState::Read {
                    self.second_phase = Some(SecondPhase::ReadSector);
                }
                self.read_sector_delay()
            }
        }
    }

    fn read_sector_delay(&self) -> u64 {
        if (self.mode & 0x80) != 0 {
            CPU_CLOCK as u64 / 150
        } else {
            CPU_CLOCK as u64 / 75
        }
    }

    /// Pulls the next raw sector out of the image into the sector buffer
    /// and advances the read position by one raw sector.
    fn read_sector(&mut self) {
        let whole_sector = (self.mode & 0x20) != 0;
        let (size, skip) = if whole_sector {
            (WHOLE_SECTOR_SIZE, 12)
        } else {
            (DATA_SECTOR_SIZE, DATA_SECTOR_SKIP)
        };
        self.sector_buffer.clear();
        if let Some(disc) = self.disc.as_ref() {
            let base = self.setloc_position + skip;
            for i in 0..size as u64 {
                self.sector_buffer.push(disc.read_byte(base + i));
            }
        } else {
            self.sector_buffer.resize(size, 0);
        }
        self.setloc_position += SECTOR_RAW_SIZE;
    }

    fn load_data_fifo(&mut self) {
        if self.data_fifo.is_empty() {
            for byte in &self.sector_buffer {
                self.data_fifo.push_back(*byte);
            }
        }
    }
}

fn bcd_to_binary(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatImage(Vec<u8>);

    impl CdImage for FlatImage {
        fn read_byte(&self, position: u64) -> u8 {
            self.0.get(position as usize).copied().unwrap_or(0)
        }
        fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    fn drive_with_disc() -> CdromDrive {
        let mut data = vec![0u8; 2352 * 400];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        CdromDrive::new(Some(Box::new(FlatImage(data))))
    }

    fn send_command(drive: &mut CdromDrive, command: u8, params: &[u8]) -> Option<u64> {
        drive.write_port0(0);
        for p in params {
            drive.write_port2(*p);
        }
        drive.write_port1(command)
    }

    fn ack_current(drive: &mut CdromDrive) -> Option<u64> {
        drive.write_port0(1);
        let scheduled = drive.write_port3(0x1F);
        drive.write_port0(0);
        scheduled
    }

    #[test]
    fn setloc_decodes_bcd_into_byte_position() {
        let mut drive = drive_with_disc();
        let delay = send_command(&mut drive, 0x02, &[0x12, 0x35, 0x46]);
        assert_eq!(delay, Some(FIRST_RESPONSE_DELAY));
        // 12:35:46 BCD -> m=12, s=35, f=46
        assert_eq!(
            drive.setloc_position(),
            ((12 * 60 + 35) * 75 + 46) * 2352
        );
    }

    #[test]
    fn getstat_first_response_is_int3_with_stat() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x01, &[]);
        assert_ne!(drive.read_port0() & 0x80, 0, "busy until the IRQ lands");
        drive.on_delayed_irq();
        assert_eq!(drive.read_port3() & 7, 0, "bank 0 reads the mask");
        drive.write_port0(1);
        assert_eq!(drive.read_port3() & 7, 3, "INT3 latched");
        drive.write_port0(0);
        assert_eq!(drive.read_port1() & 0x02, 0x02, "motor on in stat");
    }

    #[test]
    fn getid_second_response_is_licensed_signature() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x1A, &[]);
        drive.on_delayed_irq();
        drive.read_port1();
        let second = ack_current(&mut drive);
        assert_eq!(second, Some(GET_ID_SECOND_DELAY));
        drive.on_delayed_irq();
        drive.write_port0(1);
        assert_eq!(drive.read_port3() & 7, 2, "INT2");
        drive.write_port0(0);
        let mut response = [0u8; 8];
        for byte in response.iter_mut() {
            *byte = drive.read_port1();
        }
        assert_eq!(response, [0x02, 0x00, 0x20, 0x00, b'S', b'C', b'E', b'E']);
    }

    #[test]
    fn getid_region_letter_follows_the_licence_text() {
        // an NTSC-U system area: the licence text sits in sector 4
        let mut data = vec![0u8; 2352 * 400];
        let text = b"          Licensed  by          Sony Computer Entertainment Amer  ica";
        let base = ((150 + 4) * 2352 + 24) as usize;
        data[base..base + text.len()].copy_from_slice(text);
        let mut drive = CdromDrive::new(Some(Box::new(FlatImage(data))));

        send_command(&mut drive, 0x1A, &[]);
        drive.on_delayed_irq();
        drive.read_port1();
        ack_current(&mut drive);
        drive.on_delayed_irq();
        drive.write_port0(0);
        let mut response = [0u8; 8];
        for byte in response.iter_mut() {
            *byte = drive.read_port1();
        }
        assert_eq!(&response[4..], b"SCEA");
    }

    #[test]
    fn test_command_reports_controller_date() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x19, &[0x20]);
        drive.on_delayed_irq();
        let mut version = [0u8; 4];
        for byte in version.iter_mut() {
            *byte = drive.read_port1();
        }
        assert_eq!(version, [0x94, 0x11, 0x18, 0xC0]);
    }

    #[test]
    fn readn_streams_sectors_and_advances_position() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x02, &[0x00, 0x02, 0x00]); // 00:02:00
        drive.on_delayed_irq();
        ack_current(&mut drive);
        let start = drive.setloc_position();

        send_command(&mut drive, 0x06, &[]);
        drive.on_delayed_irq();
        let first_sector = ack_current(&mut drive);
        assert!(first_sector.is_some(), "INT1 scheduled after the ack");
        drive.on_delayed_irq();
        drive.write_port0(1);
        assert_eq!(drive.read_port3() & 7, 1, "data-ready INT1");
        drive.write_port0(0);
        assert_eq!(drive.setloc_position(), start + 2352);

        // BFRD pulls the 800h payload into the data FIFO
        drive.write_port3(0x80);
        let mut bytes = 0;
        while drive.read_port0() & 0x40 != 0 {
            drive.read_port2();
            bytes += 1;
        }
        assert_eq!(bytes, 0x800);

        // next ack keeps the stream going
        let next = ack_current(&mut drive);
        assert!(next.is_some());
        drive.on_delayed_irq();
        assert_eq!(drive.setloc_position(), start + 2 * 2352);
    }

    #[test]
    fn pause_stops_the_read_stream() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x06, &[]);
        drive.on_delayed_irq();
        ack_current(&mut drive);
        drive.on_delayed_irq(); // first sector INT1 pending

        send_command(&mut drive, 0x09, &[]);
        drive.on_delayed_irq();
        drive.read_port1();
        let second = ack_current(&mut drive);
        assert_eq!(second, Some(STD_SECOND_DELAY));
        drive.on_delayed_irq();
        // draining that ack must not schedule more sectors
        assert_eq!(ack_current(&mut drive), None);
    }

    #[test]
    fn setmode_whole_sector_delivers_924h_bytes() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x0E, &[0x20]);
        drive.on_delayed_irq();
        ack_current(&mut drive);

        send_command(&mut drive, 0x06, &[]);
        drive.on_delayed_irq();
        ack_current(&mut drive);
        drive.on_delayed_irq();
        drive.write_port3(0x80);
        let mut bytes = 0;
        while drive.read_port0() & 0x40 != 0 {
            drive.read_port2();
            bytes += 1;
        }
        assert_eq!(bytes, 0x924);
    }

    #[test]
    fn unknown_command_leaves_response_fifo_empty() {
        let mut drive = drive_with_disc();
        let delay = send_command(&mut drive, 0x5A, &[]);
        assert!(delay.is_none());
        assert_eq!(drive.read_port0() & 0x20, 0, "no response bytes");
    }

    #[test]
    fn double_speed_halves_the_sector_delay() {
        let mut drive = drive_with_disc();
        send_command(&mut drive, 0x0E, &[0x80]);
        drive.on_delayed_irq();
        ack_current(&mut drive);
        assert_eq!(drive.read_sector_delay(), CPU_CLOCK as u64 / 150);
    }
}
