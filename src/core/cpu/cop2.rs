use std::cmp;
use tracing::debug;

/*
GTE Command Encoding (COP2 imm25 opcodes):
  31-25  Must be 0100101b for "COP2 imm25" instructions
  20-24  Fake GTE Command Number (00h..1Fh) (ignored by hardware)
  19     sf - Shift Fraction in IR registers (0=No fraction, 1=12bit fraction)
  17-18  MVMVA Multiply Matrix    (0=Rotation, 1=Light, 2=Colour, 3=Reserved)
  15-16  MVMVA Multiply Vector    (0=V0, 1=V1, 2=V2, 3=IR)
  13-14  MVMVA Translation Vector (0=TR, 1=BK, 2=FC/Bugged, 3=None)
  10     lm - Saturate IR1,IR2,IR3 result (0=To -8000h..+7FFFh, 1=To 0..+7FFFh)
  0-5    Real GTE Command Number (00h..3Fh) (used by hardware)
 */

#[derive(Clone, Copy, Debug, Default)]
struct Matrix3x3 {
    m11: i16, m12: i16, m13: i16,
    m21: i16, m22: i16, m23: i16,
    m31: i16, m32: i16, m33: i16,
}

#[derive(Clone, Copy, Debug, Default)]
struct Vec2<T> {
    x: T,
    y: T,
}

#[derive(Clone, Copy, Debug, Default)]
struct Vec3<T> {
    x: T,
    y: T,
    z: T,
}

#[derive(Clone, Copy, Debug, Default)]
struct Rgbc {
    r: u8,
    g: u8,
    b: u8,
    c: u8,
}

/// Reciprocal seed table for the unsigned Newton-Raphson divide.
const UNR_TABLE: [u8; 0x101] = [
    0xFF, 0xFD, 0xFB, 0xF9, 0xF7, 0xF5, 0xF3, 0xF1, 0xEF, 0xEE, 0xEC, 0xEA, 0xE8, 0xE6, 0xE4, 0xE3,
    0xE1, 0xDF, 0xDD, 0xDC, 0xDA, 0xD8, 0xD6, 0xD5, 0xD3, 0xD1, 0xD0, 0xCE, 0xCD, 0xCB, 0xC9, 0xC8,
    0xC6, 0xC5, 0xC3, 0xC1, 0xC0, 0xBE, 0xBD, 0xBB, 0xBA, 0xB8, 0xB7, 0xB5, 0xB4, 0xB2, 0xB1, 0xB0,
    0xAE, 0xAD, 0xAB, 0xAA, 0xA9, 0xA7, 0xA6, 0xA4, 0xA3, 0xA2, 0xA0, 0x9F, 0x9E, 0x9C, 0x9B, 0x9A,
    0x99, 0x97, 0x96, 0x95, 0x94, 0x92, 0x91, 0x90, 0x8F, 0x8D, 0x8C, 0x8B, 0x8A, 0x89, 0x87, 0x86,
    0x85, 0x84, 0x83, 0x82, 0x81, 0x7F, 0x7E, 0x7D, 0x7C, 0x7B, 0x7A, 0x79, 0x78, 0x77, 0x75, 0x74,
    0x73, 0x72, 0x71, 0x70, 0x6F, 0x6E, 0x6D, 0x6C, 0x6B, 0x6A, 0x69, 0x68, 0x67, 0x66, 0x65, 0x64,
    0x63, 0x62, 0x61, 0x60, 0x5F, 0x5E, 0x5D, 0x5D, 0x5C, 0x5B, 0x5A, 0x59, 0x58, 0x57, 0x56, 0x55,
    0x54, 0x53, 0x53, 0x52, 0x51, 0x50, 0x4F, 0x4E, 0x4D, 0x4D, 0x4C, 0x4B, 0x4A, 0x49, 0x48, 0x48,
    0x47, 0x46, 0x45, 0x44, 0x43, 0x43, 0x42, 0x41, 0x40, 0x3F, 0x3F, 0x3E, 0x3D, 0x3C, 0x3C, 0x3B,
    0x3A, 0x39, 0x39, 0x38, 0x37, 0x36, 0x36, 0x35, 0x34, 0x33, 0x33, 0x32, 0x31, 0x31, 0x30, 0x2F,
    0x2E, 0x2E, 0x2D, 0x2C, 0x2C, 0x2B, 0x2A, 0x2A, 0x29, 0x28, 0x28, 0x27, 0x26, 0x26, 0x25, 0x24,
    0x24, 0x23, 0x22, 0x22, 0x21, 0x20, 0x20, 0x1F, 0x1E, 0x1E, 0x1D, 0x1D, 0x1C, 0x1B, 0x1B, 0x1A,
    0x19, 0x19, 0x18, 0x18, 0x17, 0x16, 0x16, 0x15, 0x15, 0x14, 0x14, 0x13, 0x12, 0x12, 0x11, 0x11,
    0x10, 0x0F, 0x0F, 0x0E, 0x0E, 0x0D, 0x0D, 0x0C, 0x0C, 0x0B, 0x0A, 0x0A, 0x09, 0x09, 0x08, 0x08,
    0x07, 0x07, 0x06, 0x06, 0x05, 0x05, 0x04, 0x04, 0x03, 0x03, 0x02, 0x02, 0x01, 0x01, 0x00, 0x00,
    0x00,
];

/*
  Opc  Name   Clk
  01h  RTPS   15   Perspective transformation, single
  06h  NCLIP  8    Normal clipping
  0Ch  OP     6    Cross product of 2 vectors
  10h  DPCS   8    Depth cueing single
  11h  INTPL  8    Interpolation of a vector and far colour
  12h  MVMVA  8    Multiply vector by matrix and add vector
  13h  NCDS   19   Normal colour depth cue single vector
  14h  CDP    13   Colour depth cue
  16h  NCDT   44   Normal colour depth cue triple vectors
  1Bh  NCCS   17   Normal colour colour single vector
  1Ch  CC     11   Colour colour
  1Eh  NCS    14   Normal colour single
  20h  NCT    30   Normal colour triple
  28h  SQR    5    Square of vector IR
  29h  DCPL   8    Depth cue colour light
  2Ah  DPCT   17   Depth cueing triple
  2Dh  AVSZ3  5    Average of three Z values
  2Eh  AVSZ4  6    Average of four Z values
  30h  RTPT   23   Perspective transformation triple
  3Dh  GPF    5    General purpose interpolation
  3Eh  GPL    5    General purpose interpolation with base
  3Fh  NCCT   39   Normal colour colour triple vector
 */
pub struct Gte {
    commands: [(fn(&mut Gte), usize); 0x40],
    sf: usize,
    mx: usize,
    sv: usize,
    cv: usize,
    lm: bool,

    // Control registers
    rotation: Matrix3x3,
    tr: Vec3<i32>,
    light: Matrix3x3,
    bk: Vec3<i32>,
    colour: Matrix3x3,
    fc: Vec3<i32>,
    ofx: i32,
    ofy: i32,
    h: u16,
    dqa: i16,
    dqb: i32,
    zsf3: i16,
    zsf4: i16,
    flags: u32,

    // Data registers
    v: [Vec3<i16>; 3],
    rgb: Rgbc,
    otz: u16,
    ir: [i16; 4],
    sxy_fifo: [Vec2<i16>; 3],
    sz_fifo: [u16; 4],
    rgb_fifo: [Rgbc; 3],
    res1: u32,
    mac: [i32; 4],
    lzcs: i32,
    lzcr: u32,
}

impl Gte {
    pub fn new() -> Gte {
        let mut gte = Gte {
            commands: [(Gte::command_unknown, 0); 0x40],
            sf: 0,
            mx: 0,
            sv: 0,
            cv: 0,
            lm: false,
            rotation: Matrix3x3::default(),
            tr: Vec3::default(),
            light: Matrix3x3::default(),
            bk: Vec3::default(),
            colour: Matrix3x3::default(),
            fc: Vec3::default(),
            ofx: 0,
            ofy: 0,
            h: 0,
            dqa: 0,
            dqb: 0,
            zsf3: 0,
            zsf4: 0,
            flags: 0,
            v: [Vec3::default(); 3],
            rgb: Rgbc::default(),
            otz: 0,
            ir: [0; 4],
            sxy_fifo: [Vec2::default(); 3],
            sz_fifo: [0; 4],
            rgb_fifo: [Rgbc::default(); 3],
            res1: 0,
            mac: [0; 4],
            lzcs: 0,
            lzcr: 32,
        };
        gte.init_commands();
        gte
    }

    fn init_commands(&mut self) {
        for opcode in 0..0x40 {
            self.commands[opcode] = match opcode {
                0x01 => (Gte::command_rtps, 15),
                0x06 => (Gte::command_nclip, 8),
                0x0C => (Gte::command_op, 6),
                0x10 => (Gte::command_dpcs, 8),
                0x11 => (Gte::command_intpl, 8),
                0x12 => (Gte::command_mvmva, 8),
                0x13 => (Gte::command_ncds, 19),
                0x14 => (Gte::command_cdp, 13),
                0x16 => (Gte::command_ncdt, 44),
                0x1B => (Gte::command_nccs, 17),
                0x1C => (Gte::command_cc, 11),
                0x1E => (Gte::command_ncs, 14),
                0x20 => (Gte::command_nct, 30),
                0x28 => (Gte::command_sqr, 5),
                0x29 => (Gte::command_dcpl, 8),
                0x2A => (Gte::command_dpct, 17),
                0x2D => (Gte::command_avsz3, 5),
                0x2E => (Gte::command_avsz4, 6),
                0x30 => (Gte::command_rtpt, 23),
                0x3D => (Gte::command_gpf, 5),
                0x3E => (Gte::command_gpl, 5),
                0x3F => (Gte::command_ncct, 39),
                _ => (Gte::command_unknown, 0),
            };
        }
    }

    /// Runs one GTE command and returns its fixed cycle cost.
    pub fn execute_command(&mut self, command: u32) -> usize {
        self.sf = if (command & 0x8_0000) != 0 { 12 } else { 0 };
        self.mx = ((command >> 17) & 3) as usize;
        self.sv = ((command >> 15) & 3) as usize;
        self.cv = ((command >> 13) & 3) as usize;
        self.lm = (command & 0x400) != 0;

        let opcode = (command & 0x3F) as usize;
        self.flags = 0;

        let (function, cycles) = self.commands[opcode];
        function(self);

        // bit 31 summarises bits 30..23 and 18..13
        if (self.flags & 0x7F87_E000) != 0 {
            self.flags |= 0x8000_0000;
        }

        cycles
    }

    pub fn read_data_register(&self, index: usize) -> u32 {
        match index {
            0 => (self.v[0].x as u16 as u32) | ((self.v[0].y as u16 as u32) << 16),
            1 => self.v[0].z as u32,
            2 => (self.v[1].x as u16 as u32) | ((self.v[1].y as u16 as u32) << 16),
            3 => self.v[1].z as u32,
            4 => (self.v[2].x as u16 as u32) | ((self.v[2].y as u16 as u32) << 16),
            5 => self.v[2].z as u32,
            6 => {
                (self.rgb.r as u32)
                    | ((self.rgb.g as u32) << 8)
                    | ((self.rgb.b as u32) << 16)
                    | ((self.rgb.c as u32) << 24)
            }
            7 => self.otz as u32,
            8..=11 => self.ir[index - 8] as u32,
            12 => (self.sxy_fifo[0].x as u16 as u32) | ((self.sxy_fifo[0].y as u16 as u32) << 16),
            13 => (self.sxy_fifo[1].x as u16 as u32) | ((self.sxy_fifo[1].y as u16 as u32) << 16),
            // SXYP mirrors SXY2 on read
            14 | 15 => (self.sxy_fifo[2].x as u16 as u32) | ((self.sxy_fifo[2].y as u16 as u32) << 16),
            16..=19 => self.sz_fifo[index - 16] as u32,
            20..=22 => {
                let entry = &self.rgb_fifo[index - 20];
                (entry.r as u32) | ((entry.g as u32) << 8) | ((entry.b as u32) << 16) | ((entry.c as u32) << 24)
            }
            23 => self.res1,
            24..=27 => self.mac[index - 24] as u32,
            28 | 29 => {
                let r = Gte::saturate_i16_to_u5(self.ir[1] >> 7) as u32;
                let g = Gte::saturate_i16_to_u5(self.ir[2] >> 7) as u32;
                let b = Gte::saturate_i16_to_u5(self.ir[3] >> 7) as u32;
                r | (g << 5) | (b << 10)
            }
            30 => self.lzcs as u32,
            31 => self.lzcr,
            _ => unreachable!(),
        }
    }

    pub fn write_data_register(&mut self, index: usize, value: u32) {
        match index {
            0 => {
                self.v[0].x = value as i16;
                self.v[0].y = (value >> 16) as i16;
            }
            1 => self.v[0].z = value as i16,
            2 => {
                self.v[1].x = value as i16;
                self.v[1].y = (value >> 16) as i16;
            }
            3 => self.v[1].z = value as i16,
            4 => {
                self.v[2].x = value as i16;
                self.v[2].y = (value >> 16) as i16;
            }
            5 => self.v[2].z = value as i16,
            6 => {
                self.rgb.r = value as u8;
                self.rgb.g = (value >> 8) as u8;
                self.rgb.b = (value >> 16) as u8;
                self.rgb.c = (value >> 24) as u8;
            }
            8..=11 => self.ir[index - 8] = value as i16,
            12 => {
                self.sxy_fifo[0].x = value as i16;
                self.sxy_fifo[0].y = (value >> 16) as i16;
            }
            13 => {
                self.sxy_fifo[1].x = value as i16;
                self.sxy_fifo[1].y = (value >> 16) as i16;
            }
            14 => {
                self.sxy_fifo[2].x = value as i16;
                self.sxy_fifo[2].y = (value >> 16) as i16;
            }
            15 => {
                // SXYP write advances the screen coordinate FIFO
                self.push_sx(value as i16);
                self.push_sy((value >> 16) as i16);
            }
            16..=19 => self.sz_fifo[index - 16] = value as u16,
            20..=22 => {
                let entry = &mut self.rgb_fifo[index - 20];
                entry.r = value as u8;
                entry.g = (value >> 8) as u8;
                entry.b = (value >> 16) as u8;
                entry.c = (value >> 24) as u8;
            }
            24..=27 => self.mac[index - 24] = value as i32,
            28 => {
                self.ir[1] = ((value & 0x1F) << 7) as i16;
                self.ir[2] = (((value >> 5) & 0x1F) << 7) as i16;
                self.ir[3] = (((value >> 10) & 0x1F) << 7) as i16;
            }
            30 => {
                self.lzcs = value as i32;
                self.lzcr = if self.lzcs >= 0 {
                    (self.lzcs as u32).leading_zeros()
                } else {
                    (self.lzcs as u32).leading_ones()
                };
            }
            // OTZ, RES1, ORGB and LZCR discard writes
            7 | 23 | 29 | 31 => {}
            _ => unreachable!(),
        }
    }

    pub fn read_control_register(&self, index: usize) -> u32 {
        match index {
            0 => ((self.rotation.m12 as u16 as u32) << 16) | (self.rotation.m11 as u16 as u32),
            1 => ((self.rotation.m21 as u16 as u32) << 16) | (self.rotation.m13 as u16 as u32),
            2 => ((self.rotation.m23 as u16 as u32) << 16) | (self.rotation.m22 as u16 as u32),
            3 => ((self.rotation.m32 as u16 as u32) << 16) | (self.rotation.m31 as u16 as u32),
            4 => self.rotation.m33 as u32,
            5 => self.tr.x as u32,
            6 => self.tr.y as u32,
            7 => self.tr.z as u32,
            8 => ((self.light.m12 as u16 as u32) << 16) | (self.light.m11 as u16 as u32),
            9 => ((self.light.m21 as u16 as u32) << 16) | (self.light.m13 as u16 as u32),
            10 => ((self.light.m23 as u16 as u32) << 16) | (self.light.m22 as u16 as u32),
            11 => ((self.light.m32 as u16 as u32) << 16) | (self.light.m31 as u16 as u32),
            12 => self.light.m33 as u32,
            13 => self.bk.x as u32,
            14 => self.bk.y as u32,
            15 => self.bk.z as u32,
            16 => ((self.colour.m12 as u16 as u32) << 16) | (self.colour.m11 as u16 as u32),
            17 => ((self.colour.m21 as u16 as u32) << 16) | (self.colour.m13 as u16 as u32),
            18 => ((self.colour.m23 as u16 as u32) << 16) | (self.colour.m22 as u16 as u32),
            19 => ((self.colour.m32 as u16 as u32) << 16) | (self.colour.m31 as u16 as u32),
            20 => self.colour.m33 as u32,
            21 => self.fc.x as u32,
            22 => self.fc.y as u32,
            23 => self.fc.z as u32,
            24 => self.ofx as u32,
            25 => self.ofy as u32,
            // H reads back sign-extended even though it is unsigned
            26 => self.h as i16 as u32,
            27 => self.dqa as u32,
            28 => self.dqb as u32,
            29 => self.zsf3 as u32,
            30 => self.zsf4 as u32,
            31 => self.flags,
            _ => unreachable!(),
        }
    }

    pub fn write_control_register(&mut self, index: usize, value: u32) {
        match index {
            0 => {
                self.rotation.m11 = value as i16;
                self.rotation.m12 = (value >> 16) as i16;
            }
            1 => {
                self.rotation.m13 = value as i16;
                self.rotation.m21 = (value >> 16) as i16;
            }
            2 => {
                self.rotation.m22 = value as i16;
                self.rotation.m23 = (value >> 16) as i16;
            }
            3 => {
                self.rotation.m31 = value as i16;
                self.rotation.m32 = (value >> 16) as i16;
            }
            4 => self.rotation.m33 = value as i16,
            5 => self.tr.x = value as i32,
            6 => self.tr.y = value as i32,
            7 => self.tr.z = value as i32,
            8 => {
                self.light.m11 = value as i16;
                self.light.m12 = (value >> 16) as i16;
            }
            9 => {
                self.light.m13 = value as i16;
                self.light.m21 = (value >> 16) as i16;
            }
            10 => {
                self.light.m22 = value as i16;
                self.light.m23 = (value >> 16) as i16;
            }
            11 => {
                self.light.m31 = value as i16;
                self.light.m32 = (value >> 16) as i16;
            }
            12 => self.light.m33 = value as i16,
            13 => self.bk.x = value as i32,
            14 => self.bk.y = value as i32,
            15 => self.bk.z = value as i32,
            16 => {
                self.colour.m11 = value as i16;
                self.colour.m12 = (value >> 16) as i16;
            }
            17 => {
                self.colour.m13 = value as i16;
                self.colour.m21 = (value >> 16) as i16;
            }
            18 => {
                self.colour.m22 = value as i16;
                self.colour.m23 = (value >> 16) as i16;
            }
            19 => {
                self.colour.m31 = value as i16;
                self.colour.m32 = (value >> 16) as i16;
            }
            20 => self.colour.m33 = value as i16,
            21 => self.fc.x = value as i32,
            22 => self.fc.y = value as i32,
            23 => self.fc.z = value as i32,
            24 => self.ofx = value as i32,
            25 => self.ofy = value as i32,
            26 => self.h = value as u16,
            27 => self.dqa = value as i16,
            28 => self.dqb = value as i32,
            29 => self.zsf3 = value as i16,
            30 => self.zsf4 = value as i16,
            31 => {
                self.flags = value & 0x7FFF_F000;
                if (value & 0x7F87_E000) != 0 {
                    self.flags |= 0x8000_0000;
                }
            }
            _ => unreachable!(),
        }
    }

    // ===================== commands =====================

    fn command_unknown(&mut self) {
        debug!("GTE ignoring unknown command");
    }

    fn command_rtps(&mut self) {
        self.rtp(0, true);
    }

    fn command_rtpt(&mut self) {
        self.rtp(0, false);
        self.rtp(1, false);
        self.rtp(2, true);
    }

    fn command_nclip(&mut self) {
        let winding = (self.sxy_fifo[0].x as i64 * self.sxy_fifo[1].y as i64)
            + (self.sxy_fifo[1].x as i64 * self.sxy_fifo[2].y as i64)
            + (self.sxy_fifo[2].x as i64 * self.sxy_fifo[0].y as i64)
            - (self.sxy_fifo[0].x as i64 * self.sxy_fifo[2].y as i64)
            - (self.sxy_fifo[1].x as i64 * self.sxy_fifo[0].y as i64)
            - (self.sxy_fifo[2].x as i64 * self.sxy_fifo[1].y as i64);
        self.mac[0] = self.check_mac0(winding) as i32;
    }

    fn command_op(&mut self) {
        let lm = self.lm;
        let ir1 = self.ir[1] as i64;
        let ir2 = self.ir[2] as i64;
        let ir3 = self.ir[3] as i64;
        let d1 = self.rotation.m11 as i64;
        let d2 = self.rotation.m22 as i64;
        let d3 = self.rotation.m33 as i64;

        self.mac[1] = (self.check_mac(1, ir3 * d2 - ir2 * d3) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, ir1 * d3 - ir3 * d1) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, ir2 * d1 - ir1 * d2) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
    }

    fn command_dpcs(&mut self) {
        let rgb = self.rgb;
        self.depth_cue((rgb.r as i64) << 16, (rgb.g as i64) << 16, (rgb.b as i64) << 16);
    }

    fn command_dpct(&mut self) {
        for _ in 0..3 {
            let rgb = self.rgb_fifo[0];
            self.depth_cue((rgb.r as i64) << 16, (rgb.g as i64) << 16, (rgb.b as i64) << 16);
        }
    }

    fn command_intpl(&mut self) {
        let r = (self.ir[1] as i64) << 12;
        let g = (self.ir[2] as i64) << 12;
        let b = (self.ir[3] as i64) << 12;
        self.depth_cue(r, g, b);
    }

    fn command_mvmva(&mut self) {
        let sf = self.sf;
        let lm = self.lm;

        let mx = match self.mx {
            0 => self.rotation,
            1 => self.light,
            2 => self.colour,
            3 => {
                // reserved selector: garbage matrix assembled from RGB/IR0
                // and two rotation cells, matching the hardware
                let mut m = Matrix3x3::default();
                m.m11 = -((self.rgb.r as i16) << 4);
                m.m12 = (self.rgb.r as i16) << 4;
                m.m13 = self.ir[0];
                m.m21 = self.rotation.m13;
                m.m22 = self.rotation.m13;
                m.m23 = self.rotation.m13;
                m.m31 = self.rotation.m22;
                m.m32 = self.rotation.m22;
                m.m33 = self.rotation.m22;
                m
            }
            _ => unreachable!(),
        };

        let vector = match self.sv {
            0 => (self.v[0].x as i64, self.v[0].y as i64, self.v[0].z as i64),
            1 => (self.v[1].x as i64, self.v[1].y as i64, self.v[1].z as i64),
            2 => (self.v[2].x as i64, self.v[2].y as i64, self.v[2].z as i64),
            3 => (self.ir[1] as i64, self.ir[2] as i64, self.ir[3] as i64),
            _ => unreachable!(),
        };

        let (tx, ty, tz) = match self.cv {
            0 => (self.tr.x, self.tr.y, self.tr.z),
            1 => (self.bk.x, self.bk.y, self.bk.z),
            2 => (self.fc.x, self.fc.y, self.fc.z),
            3 => (0, 0, 0),
            _ => unreachable!(),
        };

        let mut acc = [
            self.check_mac(1, ((tx as i64) << 12) + mx.m11 as i64 * vector.0),
            self.check_mac(2, ((ty as i64) << 12) + mx.m21 as i64 * vector.0),
            self.check_mac(3, ((tz as i64) << 12) + mx.m31 as i64 * vector.0),
        ];

        if self.cv == 2 {
            // FC selector is bugged: the first column only feeds the flag
            // checks, the accumulator restarts from zero
            self.saturate_ir(1, (acc[0] >> sf) as i32, false);
            self.saturate_ir(2, (acc[1] >> sf) as i32, false);
            self.saturate_ir(3, (acc[2] >> sf) as i32, false);
            acc = [0, 0, 0];
        }

        acc[0] = self.check_mac(1, acc[0] + mx.m12 as i64 * vector.1);
        acc[1] = self.check_mac(2, acc[1] + mx.m22 as i64 * vector.1);
        acc[2] = self.check_mac(3, acc[2] + mx.m32 as i64 * vector.1);

        acc[0] = self.check_mac(1, acc[0] + mx.m13 as i64 * vector.2);
        acc[1] = self.check_mac(2, acc[1] + mx.m23 as i64 * vector.2);
        acc[2] = self.check_mac(3, acc[2] + mx.m33 as i64 * vector.2);

        self.mac[1] = (acc[0] >> sf) as i32;
        self.mac[2] = (acc[1] >> sf) as i32;
        self.mac[3] = (acc[2] >> sf) as i32;
        self.set_ir_from_mac(lm);
    }

    fn command_ncs(&mut self) {
        self.nc(0);
    }

    fn command_nct(&mut self) {
        self.nc(0);
        self.nc(1);
        self.nc(2);
    }

    fn command_nccs(&mut self) {
        self.ncc(0);
    }

    fn command_ncct(&mut self) {
        self.ncc(0);
        self.ncc(1);
        self.ncc(2);
    }

    fn command_ncds(&mut self) {
        self.ncd(0);
    }

    fn command_ncdt(&mut self) {
        self.ncd(0);
        self.ncd(1);
        self.ncd(2);
    }

    fn command_cc(&mut self) {
        let lm = self.lm;
        self.colour_matrix_stage();
        let r = (self.rgb.r as i64) << 4;
        let g = (self.rgb.g as i64) << 4;
        let b = (self.rgb.b as i64) << 4;
        self.mac[1] = (self.check_mac(1, r * self.ir[1] as i64) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, g * self.ir[2] as i64) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, b * self.ir[3] as i64) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    fn command_cdp(&mut self) {
        self.colour_matrix_stage();
        self.depth_cue_lit();
    }

    fn command_dcpl(&mut self) {
        self.depth_cue_lit();
    }

    fn command_sqr(&mut self) {
        let lm = self.lm;
        let ir1 = self.ir[1] as i64;
        let ir2 = self.ir[2] as i64;
        let ir3 = self.ir[3] as i64;
        self.mac[1] = (self.check_mac(1, ir1 * ir1) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, ir2 * ir2) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, ir3 * ir3) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
    }

    fn command_avsz3(&mut self) {
        let sum = self.sz_fifo[1] as i64 + self.sz_fifo[2] as i64 + self.sz_fifo[3] as i64;
        let average = self.zsf3 as i64 * sum;
        self.mac[0] = self.check_mac0(average) as i32;
        self.otz = self.saturate_sz3_otz(average >> 12);
    }

    fn command_avsz4(&mut self) {
        let sum = self.sz_fifo[0] as i64
            + self.sz_fifo[1] as i64
            + self.sz_fifo[2] as i64
            + self.sz_fifo[3] as i64;
        let average = self.zsf4 as i64 * sum;
        self.mac[0] = self.check_mac0(average) as i32;
        self.otz = self.saturate_sz3_otz(average >> 12);
    }

    fn command_gpf(&mut self) {
        let lm = self.lm;
        let ir0 = self.ir[0] as i64;
        self.mac[1] = (self.check_mac(1, ir0 * self.ir[1] as i64) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, ir0 * self.ir[2] as i64) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, ir0 * self.ir[3] as i64) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    fn command_gpl(&mut self) {
        let lm = self.lm;
        let ir0 = self.ir[0] as i64;
        let base1 = (self.mac[1] as i64) << self.sf;
        let base2 = (self.mac[2] as i64) << self.sf;
        let base3 = (self.mac[3] as i64) << self.sf;
        self.mac[1] = (self.check_mac(1, base1 + ir0 * self.ir[1] as i64) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, base2 + ir0 * self.ir[2] as i64) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, base3 + ir0 * self.ir[3] as i64) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    // ===================== shared stages =====================

    /// Perspective transform of one vertex; `dq` selects the depth cueing
    /// tail that only the last vertex of a command runs.
    fn rtp(&mut self, index: usize, dq: bool) {
        let sf = self.sf;
        let lm = self.lm;

        let vx = self.v[index].x as i64;
        let vy = self.v[index].y as i64;
        let vz = self.v[index].z as i64;
        let m = self.rotation;

        let mut acc = [
            self.check_mac(1, ((self.tr.x as i64) << 12) + m.m11 as i64 * vx),
            self.check_mac(2, ((self.tr.y as i64) << 12) + m.m21 as i64 * vx),
            self.check_mac(3, ((self.tr.z as i64) << 12) + m.m31 as i64 * vx),
        ];
        acc[0] = self.check_mac(1, acc[0] + m.m12 as i64 * vy);
        acc[1] = self.check_mac(2, acc[1] + m.m22 as i64 * vy);
        acc[2] = self.check_mac(3, acc[2] + m.m32 as i64 * vy);
        acc[0] = self.check_mac(1, acc[0] + m.m13 as i64 * vz);
        acc[1] = self.check_mac(2, acc[1] + m.m23 as i64 * vz);
        acc[2] = self.check_mac(3, acc[2] + m.m33 as i64 * vz);

        self.mac[1] = (acc[0] >> sf) as i32;
        self.mac[2] = (acc[1] >> sf) as i32;
        self.mac[3] = (acc[2] >> sf) as i32;

        // the unshifted Z feeds both the SZ push and the quirky IR3 check
        let zs = acc[2] >> 12;

        let mac1 = self.mac[1];
        let mac2 = self.mac[2];
        let mac3 = self.mac[3];
        self.ir[1] = self.saturate_ir(1, mac1, lm);
        self.ir[2] = self.saturate_ir(2, mac2, lm);
        self.ir[3] = self.saturate_ir3_z(mac3, zs, lm);

        let sz3 = self.saturate_sz3_otz(zs);
        self.push_sz(sz3);

        let h_div_sz = if sz3 as u32 > (self.h as u32) / 2 {
            Gte::divide(self.h, sz3)
        } else {
            self.flags |= 0x2_0000;
            0x1_FFFF
        };

        let sx = self.ofx as i64 + self.ir[1] as i64 * h_div_sz as i64;
        let sx = self.check_mac0(sx) >> 16;
        let sx = self.saturate_sxy(1, sx as i32);
        self.push_sx(sx);

        let sy = self.ofy as i64 + self.ir[2] as i64 * h_div_sz as i64;
        let sy = self.check_mac0(sy) >> 16;
        let sy = self.saturate_sxy(2, sy as i32);
        self.push_sy(sy);

        if dq {
            let depth = self.dqb as i64 + self.dqa as i64 * h_div_sz as i64;
            self.mac[0] = self.check_mac0(depth) as i32;
            self.ir[0] = self.saturate_ir0(depth >> 12);
        }
    }

    /// Light matrix times vertex, result saturated into IR1..IR3.
    fn light_matrix_stage(&mut self, index: usize) {
        let lm = self.lm;
        let vx = self.v[index].x as i64;
        let vy = self.v[index].y as i64;
        let vz = self.v[index].z as i64;
        let m = self.light;

        let mut acc = [
            self.check_mac(1, m.m11 as i64 * vx),
            self.check_mac(2, m.m21 as i64 * vx),
            self.check_mac(3, m.m31 as i64 * vx),
        ];
        acc[0] = self.check_mac(1, acc[0] + m.m12 as i64 * vy);
        acc[1] = self.check_mac(2, acc[1] + m.m22 as i64 * vy);
        acc[2] = self.check_mac(3, acc[2] + m.m32 as i64 * vy);
        acc[0] = self.check_mac(1, acc[0] + m.m13 as i64 * vz);
        acc[1] = self.check_mac(2, acc[1] + m.m23 as i64 * vz);
        acc[2] = self.check_mac(3, acc[2] + m.m33 as i64 * vz);

        self.mac[1] = (acc[0] >> self.sf) as i32;
        self.mac[2] = (acc[1] >> self.sf) as i32;
        self.mac[3] = (acc[2] >> self.sf) as i32;
        self.set_ir_from_mac(lm);
    }

    /// Background colour plus colour matrix times IR1..IR3.
    fn colour_matrix_stage(&mut self) {
        let lm = self.lm;
        let ir1 = self.ir[1] as i64;
        let ir2 = self.ir[2] as i64;
        let ir3 = self.ir[3] as i64;
        let m = self.colour;

        let mut acc = [
            self.check_mac(1, ((self.bk.x as i64) << 12) + m.m11 as i64 * ir1),
            self.check_mac(2, ((self.bk.y as i64) << 12) + m.m21 as i64 * ir1),
            self.check_mac(3, ((self.bk.z as i64) << 12) + m.m31 as i64 * ir1),
        ];
        acc[0] = self.check_mac(1, acc[0] + m.m12 as i64 * ir2);
        acc[1] = self.check_mac(2, acc[1] + m.m22 as i64 * ir2);
        acc[2] = self.check_mac(3, acc[2] + m.m32 as i64 * ir2);
        acc[0] = self.check_mac(1, acc[0] + m.m13 as i64 * ir3);
        acc[1] = self.check_mac(2, acc[1] + m.m23 as i64 * ir3);
        acc[2] = self.check_mac(3, acc[2] + m.m33 as i64 * ir3);

        self.mac[1] = (acc[0] >> self.sf) as i32;
        self.mac[2] = (acc[1] >> self.sf) as i32;
        self.mac[3] = (acc[2] >> self.sf) as i32;
        self.set_ir_from_mac(lm);
    }

    /// Far colour interpolation of an RGB triple already scaled to 4.12.
    fn depth_cue(&mut self, r: i64, g: i64, b: i64) {
        let lm = self.lm;

        self.mac[1] = (self.check_mac(1, ((self.fc.x as i64) << 12) - r) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, ((self.fc.y as i64) << 12) - g) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, ((self.fc.z as i64) << 12) - b) >> self.sf) as i32;
        self.set_ir_from_mac(false);

        let ir0 = self.ir[0] as i64;
        self.mac[1] = (self.check_mac(1, r + self.ir[1] as i64 * ir0) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, g + self.ir[2] as i64 * ir0) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, b + self.ir[3] as i64 * ir0) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    /// Depth cue of the primary colour modulated by IR1..IR3 (the DCPL/CDP
    /// tail, and the final stage of the NCDx family via `ncd`).
    fn depth_cue_lit(&mut self) {
        let lm = self.lm;
        let ir0 = self.ir[0] as i64;
        let ir1 = self.ir[1] as i64;
        let ir2 = self.ir[2] as i64;
        let ir3 = self.ir[3] as i64;
        let r = (self.rgb.r as i64) << 4;
        let g = (self.rgb.g as i64) << 4;
        let b = (self.rgb.b as i64) << 4;

        self.mac[1] = (self.check_mac(1, ((self.fc.x as i64) << 12) - r * ir1) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, ((self.fc.y as i64) << 12) - g * ir2) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, ((self.fc.z as i64) << 12) - b * ir3) >> self.sf) as i32;

        let mac1 = self.mac[1];
        let mac2 = self.mac[2];
        let mac3 = self.mac[3];
        let far1 = self.saturate_ir(1, mac1, false) as i64;
        let far2 = self.saturate_ir(2, mac2, false) as i64;
        let far3 = self.saturate_ir(3, mac3, false) as i64;

        self.mac[1] = (self.check_mac(1, r * ir1 + ir0 * far1) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, g * ir2 + ir0 * far2) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, b * ir3 + ir0 * far3) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    fn nc(&mut self, index: usize) {
        self.light_matrix_stage(index);
        self.colour_matrix_stage();
        self.push_colour_from_mac();
    }

    fn ncc(&mut self, index: usize) {
        let lm = self.lm;
        self.light_matrix_stage(index);
        self.colour_matrix_stage();
        let r = (self.rgb.r as i64) << 4;
        let g = (self.rgb.g as i64) << 4;
        let b = (self.rgb.b as i64) << 4;
        self.mac[1] = (self.check_mac(1, r * self.ir[1] as i64) >> self.sf) as i32;
        self.mac[2] = (self.check_mac(2, g * self.ir[2] as i64) >> self.sf) as i32;
        self.mac[3] = (self.check_mac(3, b * self.ir[3] as i64) >> self.sf) as i32;
        self.set_ir_from_mac(lm);
        self.push_colour_from_mac();
    }

    fn ncd(&mut self, index: usize) {
        self.light_matrix_stage(index);
        self.colour_matrix_stage();
        self.depth_cue_lit();
    }

    // ===================== saturation & flag helpers =====================

    #[inline]
    fn saturate_i64_to_i44(value: i64) -> i64 {
        (value << 20) >> 20
    }

    #[inline]
    fn saturate_i16_to_u5(value: i16) -> u8 {
        value.clamp(0, 0x1F) as u8
    }

    /// 44-bit MAC1..MAC3 accumulation check, flag bits 30/29/28 and
    /// 27/26/25.
    #[inline]
    fn check_mac(&mut self, index: usize, value: i64) -> i64 {
        if value < -0x800_0000_0000 {
            self.flags |= 0x800_0000 >> (index - 1);
        }
        if value > 0x7FF_FFFF_FFFF {
            self.flags |= 0x4000_0000 >> (index - 1);
        }
        Gte::saturate_i64_to_i44(value)
    }

    /// 32-bit MAC0 check, flag bits 16/15.
    #[inline]
    fn check_mac0(&mut self, value: i64) -> i64 {
        if value < -0x8000_0000 {
            self.flags |= 0x8000;
        } else if value > 0x7FFF_FFFF {
            self.flags |= 0x1_0000;
        }
        value
    }

    /// IR1..IR3 saturation, flag bits 24/23/22.
    #[inline]
    fn saturate_ir(&mut self, index: usize, value: i32, lm: bool) -> i16 {
        let low = if lm { 0 } else { -0x8000 };
        if value < low {
            self.flags |= 0x100_0000 >> (index - 1);
            return low as i16;
        }
        if value > 0x7FFF {
            self.flags |= 0x100_0000 >> (index - 1);
            return 0x7FFF;
        }
        value as i16
    }

    /// The RTPS IR3 quirk: the saturation flag compares the unshifted Z
    /// value even when the returned IR3 comes from the shifted MAC3.
    #[inline]
    fn saturate_ir3_z(&mut self, value: i32, z_unshifted: i64, lm: bool) -> i16 {
        if z_unshifted < -0x8000 || z_unshifted > 0x7FFF {
            self.flags |= 0x40_0000;
        }
        let low = if lm { 0 } else { -0x8000 };
        value.clamp(low, 0x7FFF) as i16
    }

    /// Colour FIFO component saturation, flag bits 21/20/19.
    #[inline]
    fn saturate_colour(&mut self, index: usize, value: i32) -> u8 {
        if value < 0 || value > 0xFF {
            self.flags |= 0x20_0000 >> (index - 1);
        }
        value.clamp(0, 0xFF) as u8
    }

    /// SZ3/OTZ saturation, flag bit 18.
    #[inline]
    fn saturate_sz3_otz(&mut self, value: i64) -> u16 {
        if value < 0 || value > 0xFFFF {
            self.flags |= 0x4_0000;
        }
        value.clamp(0, 0xFFFF) as u16
    }

    /// SX2/SY2 saturation, flag bits 14/13.
    #[inline]
    fn saturate_sxy(&mut self, index: usize, value: i32) -> i16 {
        if value < -0x400 || value > 0x3FF {
            self.flags |= 0x4000 >> (index - 1);
        }
        value.clamp(-0x400, 0x3FF) as i16
    }

    /// IR0 saturation, flag bit 12.
    #[inline]
    fn saturate_ir0(&mut self, value: i64) -> i16 {
        if value < 0 || value > 0x1000 {
            self.flags |= 0x1000;
        }
        value.clamp(0, 0x1000) as i16
    }

    #[inline]
    fn set_ir_from_mac(&mut self, lm: bool) {
        let mac1 = self.mac[1];
        let mac2 = self.mac[2];
        let mac3 = self.mac[3];
        self.ir[1] = self.saturate_ir(1, mac1, lm);
        self.ir[2] = self.saturate_ir(2, mac2, lm);
        self.ir[3] = self.saturate_ir(3, mac3, lm);
    }

    #[inline]
    fn push_colour_from_mac(&mut self) {
        let r = self.saturate_colour(1, self.mac[1] >> 4);
        let g = self.saturate_colour(2, self.mac[2] >> 4);
        let b = self.saturate_colour(3, self.mac[3] >> 4);
        let c = self.rgb.c;
        self.rgb_fifo[0] = self.rgb_fifo[1];
        self.rgb_fifo[1] = self.rgb_fifo[2];
        self.rgb_fifo[2] = Rgbc { r, g, b, c };
    }

    /// Unsigned Newton-Raphson reciprocal: table seed plus two refinement
    /// steps, quotient saturated to 17 bits.
    pub fn divide(numerator: u16, divisor: u16) -> u32 {
        let shift = divisor.leading_zeros();
        let n = (numerator as u64) << shift;
        let d = (divisor as u64) << shift;
        let u = UNR_TABLE[(d as usize - 0x7FC0) >> 7] as u64 + 0x101;
        let d = (0x200_0080 - (d * u)) >> 8;
        let d = (0x80 + (d * u)) >> 8;
        cmp::min(0x1_FFFF, ((n * d + 0x8000) >> 16) as u32)
    }

    #[inline]
    fn push_sx(&mut self, sx: i16) {
        self.sxy_fifo[0].x = self.sxy_fifo[1].x;
        self.sxy_fifo[1].x = self.sxy_fifo[2].x;
        self.sxy_fifo[2].x = sx;
    }

    #[inline]
    fn push_sy(&mut self, sy: i16) {
        self.sxy_fifo[0].y = self.sxy_fifo[1].y;
        self.sxy_fifo[1].y = self.sxy_fifo[2].y;
        self.sxy_fifo[2].y = sy;
    }

    #[inline]
    fn push_sz(&mut self, sz: u16) {
        self.sz_fifo[0] = self.sz_fifo[1];
        self.sz_fifo[1] = self.sz_fifo[2];
        self.sz_fifo[2] = self.sz_fifo[3];
        self.sz_fifo[3] = sz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // identity rotation, V0 = (0, 0, 0x1000), H = 0x200, sf = 1
    fn rtps_identity_setup() -> Gte {
        let mut gte = Gte::new();
        gte.write_control_register(0, 0x1000); // R11 = 1.0
        gte.write_control_register(2, 0x1000); // R22 = 1.0
        gte.write_control_register(4, 0x1000); // R33 = 1.0
        gte.write_control_register(26, 0x200); // H
        gte.write_data_register(0, 0);
        gte.write_data_register(1, 0x1000); // VZ0
        gte
    }

    #[test]
    fn rtps_identity_vertex() {
        let mut gte = rtps_identity_setup();
        let cycles = gte.execute_command(0x8_0001); // RTPS, sf=1
        assert_eq!(cycles, 15);
        assert_eq!(gte.read_data_register(19), 0x1000); // SZ3
        assert_eq!(gte.read_data_register(27), 0x1000); // MAC3
        assert_eq!(gte.read_data_register(11), 0x1000); // IR3
        assert_eq!(gte.read_data_register(14), 0); // SXY2
        assert_eq!(gte.read_data_register(8), 0); // IR0
        assert_eq!(gte.read_control_register(31), 0); // FLAG
    }

    #[test]
    fn rtps_small_z_sets_divide_overflow() {
        let mut gte = rtps_identity_setup();
        gte.write_data_register(1, 0x40); // VZ0 far below H/2
        gte.execute_command(0x8_0001);
        assert_ne!(gte.read_control_register(31) & 0x2_0000, 0);
    }

    #[test]
    fn unr_divide_close_to_ideal() {
        for divisor in [0x101u16, 0x1000, 0x7FFF, 0xABCD, 0xFFFF] {
            for numerator in [0x10u16, 0x100, 0x5000, 0x7FFF] {
                if divisor as u32 * 2 <= numerator as u32 {
                    continue;
                }
                let q = Gte::divide(numerator, divisor);
                let ideal = cmp::min(0x1_FFFF, ((numerator as u64) * 0x1_0000 / divisor as u64) as u32);
                let diff = q.abs_diff(ideal);
                assert!(diff <= 1, "divide({numerator:04X},{divisor:04X}) = {q:05X}, ideal {ideal:05X}");
            }
        }
    }

    #[test]
    fn nclip_winding_sign() {
        let mut gte = Gte::new();
        gte.write_data_register(12, 0x0000_0000); // (0, 0)
        gte.write_data_register(13, 0x0000_0010); // (16, 0)
        gte.write_data_register(14, 0x0010_0000); // (0, 16)
        gte.execute_command(0x06);
        assert_eq!(gte.read_data_register(24) as i32, 256);
    }

    #[test]
    fn lzcr_counts_leading_zeros_and_ones() {
        let mut gte = Gte::new();
        gte.write_data_register(30, 0x0000_FFFF);
        assert_eq!(gte.read_data_register(31), 16);
        gte.write_data_register(30, 0xFFFF_0000);
        assert_eq!(gte.read_data_register(31), 16);
        gte.write_data_register(30, 0);
        assert_eq!(gte.read_data_register(31), 32);
    }

    #[test]
    fn avsz3_scales_sum_of_last_three() {
        let mut gte = Gte::new();
        gte.write_control_register(29, 0x555); // ZSF3 ~ 1/3
        gte.write_data_register(17, 0x1000);
        gte.write_data_register(18, 0x1000);
        gte.write_data_register(19, 0x1000);
        gte.execute_command(0x2D);
        assert_eq!(gte.read_data_register(7), (0x555 * 0x3000) >> 12);
    }

    #[test]
    fn irgb_decomposes_into_ir_registers() {
        let mut gte = Gte::new();
        gte.write_data_register(28, 0x1F | (0x10 << 5) | (0x01 << 10));
        assert_eq!(gte.read_data_register(9), 0x1F << 7);
        assert_eq!(gte.read_data_register(10), 0x10 << 7);
        assert_eq!(gte.read_data_register(11), 0x01 << 7);
        // ORGB reassembles the 5:5:5 view
        assert_eq!(gte.read_data_register(29), 0x1F | (0x10 << 5) | (0x01 << 10));
    }

    #[test]
    fn writes_to_read_only_data_registers_are_ignored() {
        let mut gte = Gte::new();
        gte.write_data_register(7, 0x1234);
        gte.write_data_register(23, 0x5678);
        gte.write_data_register(31, 0x9ABC);
        assert_eq!(gte.read_data_register(7), 0);
        assert_eq!(gte.read_data_register(23), 0);
        assert_eq!(gte.read_data_register(31), 32);
    }

    #[test]
    fn sxyp_write_advances_fifo() {
        let mut gte = Gte::new();
        gte.write_data_register(15, 0x0001_0002);
        gte.write_data_register(15, 0x0003_0004);
        gte.write_data_register(15, 0x0005_0006);
        assert_eq!(gte.read_data_register(12), 0x0001_0002);
        assert_eq!(gte.read_data_register(13), 0x0003_0004);
        assert_eq!(gte.read_data_register(14), 0x0005_0006);
    }

    #[test]
    fn gpf_interpolates_and_pushes_colour() {
        let mut gte = Gte::new();
        gte.write_data_register(8, 0x1000); // IR0
        gte.write_data_register(9, 0x100);
        gte.write_data_register(10, 0x200);
        gte.write_data_register(11, 0x300);
        gte.execute_command(0x8_0000 | 0x3D); // GPF sf=1
        assert_eq!(gte.read_data_register(25), 0x100);
        assert_eq!(gte.read_data_register(26), 0x200);
        assert_eq!(gte.read_data_register(27), 0x300);
        assert_eq!(gte.read_data_register(22) & 0xFF, 0x10);
    }

    #[test]
    fn mac_overflow_sets_summary_bit() {
        let mut gte = Gte::new();
        gte.write_control_register(0, 0x7FFF); // R11 big
        gte.write_data_register(0, 0x7FFF); // VX0 big
        gte.write_control_register(5, 0x7FFF_FFFF); // TRX huge
        gte.execute_command(0x01); // RTPS sf=0
        let flags = gte.read_control_register(31);
        assert_ne!(flags & 0x8000_0000, 0);
    }
}
