//! Camera sensor value types.

use crate::parse::atoi;

/// Supported frame sizes. Discriminants are the sensor driver's ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    R96x96 = 0,
    Qqvga = 1,
    Qcif = 2,
    Hqvga = 3,
    R240x240 = 4,
    Qvga = 5,
    Cif = 6,
    Hvga = 7,
    Vga = 8,
    Svga = 9,
    Xga = 10,
    Hd = 11,
    Sxga = 12,
    Uxga = 13,
}

impl FrameSize {
    pub const ALL: [FrameSize; 14] = [
        FrameSize::R96x96,
        FrameSize::Qqvga,
        FrameSize::Qcif,
        FrameSize::Hqvga,
        FrameSize::R240x240,
        FrameSize::Qvga,
        FrameSize::Cif,
        FrameSize::Hvga,
        FrameSize::Vga,
        FrameSize::Svga,
        FrameSize::Xga,
        FrameSize::Hd,
        FrameSize::Sxga,
        FrameSize::Uxga,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: i64) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Width and height in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            FrameSize::R96x96 => (96, 96),
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::R240x240 => (240, 240),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }

    pub fn pixels(self) -> u32 {
        let (w, h) = self.dimensions();
        w * h
    }

    fn name(self) -> Option<&'static str> {
        match self {
            FrameSize::Qqvga => Some("QQVGA"),
            FrameSize::Qcif => Some("QCIF"),
            FrameSize::Hqvga => Some("HQVGA"),
            FrameSize::Qvga => Some("QVGA"),
            FrameSize::Cif => Some("CIF"),
            FrameSize::Hvga => Some("HVGA"),
            FrameSize::Vga => Some("VGA"),
            FrameSize::Svga => Some("SVGA"),
            FrameSize::Xga => Some("XGA"),
            FrameSize::Hd => Some("HD"),
            FrameSize::Sxga => Some("SXGA"),
            FrameSize::Uxga => Some("UXGA"),
            FrameSize::R96x96 | FrameSize::R240x240 => None,
        }
    }

    /// Parses a name (`VGA`, `FRAMESIZE_VGA`), a `WxH` size or an id.
    /// Case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let text = strip_enum_prefix(text.trim());
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            return Self::from_id(atoi(text));
        }
        Self::ALL.into_iter().find(|size| {
            let (w, h) = size.dimensions();
            let by_name = size.name().is_some_and(|n| n.eq_ignore_ascii_case(text));
            by_name || format!("{w}x{h}").eq_ignore_ascii_case(text)
        })
    }
}

/// Supported pixel formats. Discriminants are the sensor driver's ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixFormat {
    Rgb565 = 0,
    Yuv422 = 1,
    Yuv420 = 2,
    Grayscale = 3,
    Jpeg = 4,
    Rgb888 = 5,
    Raw = 6,
    Rgb444 = 7,
    Rgb555 = 8,
}

impl PixFormat {
    pub const ALL: [PixFormat; 9] = [
        PixFormat::Rgb565,
        PixFormat::Yuv422,
        PixFormat::Yuv420,
        PixFormat::Grayscale,
        PixFormat::Jpeg,
        PixFormat::Rgb888,
        PixFormat::Raw,
        PixFormat::Rgb444,
        PixFormat::Rgb555,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: i64) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            PixFormat::Rgb565 => "RGB565",
            PixFormat::Yuv422 => "YUV422",
            PixFormat::Yuv420 => "YUV420",
            PixFormat::Grayscale => "GRAYSCALE",
            PixFormat::Jpeg => "JPEG",
            PixFormat::Rgb888 => "RGB888",
            PixFormat::Raw => "RAW",
            PixFormat::Rgb444 => "RGB444",
            PixFormat::Rgb555 => "RGB555",
        }
    }

    /// Parses a name (`JPEG`, `PIXFORMAT_JPEG`) or an id. Case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        let text = strip_enum_prefix(text.trim());
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            return Self::from_id(atoi(text));
        }
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(text))
    }
}

/// Drops a `FRAMESIZE_`/`PIXFORMAT_` style prefix.
fn strip_enum_prefix(text: &str) -> &str {
    match text.find('_') {
        Some(pos) => &text[pos + 1..],
        None => text,
    }
}

/// Highest accepted gain ceiling (128x).
pub const MAX_GAIN_CEILING: u8 = 6;

/// A single sensor parameter write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSetting {
    FrameSize(FrameSize),
    PixFormat(PixFormat),
    Quality(i32),
    HMirror(bool),
    VFlip(bool),
    Contrast(i32),
    Brightness(i32),
    Sharpness(i32),
    Denoise(i32),
    GainCeiling(u8),
    Agc(bool),
    AgcGain(i32),
    Aec(bool),
    Aec2(bool),
    AeLevel(i32),
    AecValue(i32),
    Awb(bool),
    AwbGain(bool),
    WbMode(i32),
    Dcw(bool),
    Bpc(bool),
    Wpc(bool),
    RawGma(bool),
    Lenc(bool),
    SpecialEffect(i32),
}

/// Current sensor parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorStatus {
    pub framesize: FrameSize,
    pub pixformat: PixFormat,
    pub quality: i32,
    pub hmirror: bool,
    pub vflip: bool,
    pub contrast: i32,
    pub brightness: i32,
    pub sharpness: i32,
    pub denoise: i32,
    pub gain_ceiling: u8,
    pub agc: bool,
    pub agc_gain: i32,
    pub aec: bool,
    pub aec2: bool,
    pub ae_level: i32,
    pub aec_value: i32,
    pub awb: bool,
    pub awb_gain: bool,
    pub wb_mode: i32,
    pub dcw: bool,
    pub bpc: bool,
    pub wpc: bool,
    pub raw_gma: bool,
    pub lenc: bool,
    pub special_effect: i32,
}

impl Default for SensorStatus {
    fn default() -> Self {
        Self {
            framesize: FrameSize::Uxga,
            pixformat: PixFormat::Jpeg,
            quality: 12,
            hmirror: false,
            vflip: false,
            contrast: 0,
            brightness: 0,
            sharpness: 0,
            denoise: 0,
            gain_ceiling: 0,
            agc: true,
            agc_gain: 0,
            aec: true,
            aec2: false,
            ae_level: 0,
            aec_value: 204,
            awb: true,
            awb_gain: true,
            wb_mode: 0,
            dcw: true,
            bpc: false,
            wpc: true,
            raw_gma: true,
            lenc: true,
            special_effect: 0,
        }
    }
}

impl SensorStatus {
    /// Records a setting, as a driver without range checks would.
    pub fn apply(&mut self, setting: SensorSetting) {
        match setting {
            SensorSetting::FrameSize(v) => self.framesize = v,
            SensorSetting::PixFormat(v) => self.pixformat = v,
            SensorSetting::Quality(v) => self.quality = v,
            SensorSetting::HMirror(v) => self.hmirror = v,
            SensorSetting::VFlip(v) => self.vflip = v,
            SensorSetting::Contrast(v) => self.contrast = v,
            SensorSetting::Brightness(v) => self.brightness = v,
            SensorSetting::Sharpness(v) => self.sharpness = v,
            SensorSetting::Denoise(v) => self.denoise = v,
            SensorSetting::GainCeiling(v) => self.gain_ceiling = v,
            SensorSetting::Agc(v) => self.agc = v,
            SensorSetting::AgcGain(v) => self.agc_gain = v,
            SensorSetting::Aec(v) => self.aec = v,
            SensorSetting::Aec2(v) => self.aec2 = v,
            SensorSetting::AeLevel(v) => self.ae_level = v,
            SensorSetting::AecValue(v) => self.aec_value = v,
            SensorSetting::Awb(v) => self.awb = v,
            SensorSetting::AwbGain(v) => self.awb_gain = v,
            SensorSetting::WbMode(v) => self.wb_mode = v,
            SensorSetting::Dcw(v) => self.dcw = v,
            SensorSetting::Bpc(v) => self.bpc = v,
            SensorSetting::Wpc(v) => self.wpc = v,
            SensorSetting::RawGma(v) => self.raw_gma = v,
            SensorSetting::Lenc(v) => self.lenc = v,
            SensorSetting::SpecialEffect(v) => self.special_effect = v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_framesize_forms() {
        assert_eq!(FrameSize::parse("VGA"), Some(FrameSize::Vga));
        assert_eq!(FrameSize::parse("vga"), Some(FrameSize::Vga));
        assert_eq!(FrameSize::parse("FRAMESIZE_SVGA"), Some(FrameSize::Svga));
        assert_eq!(FrameSize::parse("640x480"), Some(FrameSize::Vga));
        assert_eq!(FrameSize::parse("96X96"), Some(FrameSize::R96x96));
        assert_eq!(FrameSize::parse("FRAMESIZE_240X240"), Some(FrameSize::R240x240));
        assert_eq!(FrameSize::parse("13"), Some(FrameSize::Uxga));
        assert_eq!(FrameSize::parse("14"), None);
        assert_eq!(FrameSize::parse("1920x1080"), None);
        assert_eq!(FrameSize::parse(""), None);
    }

    #[test]
    fn test_parse_pixformat_forms() {
        assert_eq!(PixFormat::parse("JPEG"), Some(PixFormat::Jpeg));
        assert_eq!(PixFormat::parse("pixformat_grayscale"), Some(PixFormat::Grayscale));
        assert_eq!(PixFormat::parse("0"), Some(PixFormat::Rgb565));
        assert_eq!(PixFormat::parse("PNG"), None);
    }

    #[test]
    fn test_ids_match_positions() {
        for (i, size) in FrameSize::ALL.iter().enumerate() {
            assert_eq!(usize::from(size.id()), i);
        }
        for (i, format) in PixFormat::ALL.iter().enumerate() {
            assert_eq!(usize::from(format.id()), i);
        }
    }
}
