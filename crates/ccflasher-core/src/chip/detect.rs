//! Chip identification and flash size detection

use super::types::{ChipIdentity, ChipModel};
use crate::error::Result;
use crate::programmer::DebugLink;
use crate::protocol::{commands, regs, DebugSession};

/// Bytes compared at each aliasing probe point
pub const SIZE_SAMPLE_LEN: usize = 8;

/// Probe points for aliasing detection: 0, 8 KiB and 16 KiB
pub const SIZE_SAMPLE_OFFSETS: [u32; 3] = [0x0000, 0x2000, 0x4000];

/// Infer flash size from code samples taken at 0, 8 KiB and 16 KiB
///
/// Flash smaller than the address space repeats every physical size, so
/// identical samples give the size away. Erased flash all reads 0xFF and
/// cannot be told apart, in which case `nominal` is returned.
pub fn flash_size_from_samples(
    nominal: u32,
    at_0: &[u8; SIZE_SAMPLE_LEN],
    at_8k: &[u8; SIZE_SAMPLE_LEN],
    at_16k: &[u8; SIZE_SAMPLE_LEN],
) -> u32 {
    if at_0.iter().all(|&b| b == 0xFF) {
        return nominal;
    }
    if at_0 == at_8k && at_0 == at_16k {
        return 8 * 1024;
    }
    if at_0 == at_16k {
        return 16 * 1024;
    }
    nominal
}

impl<L: DebugLink> DebugSession<L> {
    /// Detect the flash size from the chip id and code aliasing
    pub fn detect_flash_size(&mut self) -> Result<u32> {
        let nominal = self.chip_id().model().max_flash_size();

        let mut samples = [[0u8; SIZE_SAMPLE_LEN]; 3];
        for (sample, &offset) in samples.iter_mut().zip(SIZE_SAMPLE_OFFSETS.iter()) {
            self.read_code(offset, sample)?;
        }

        let size = flash_size_from_samples(nominal, &samples[0], &samples[1], &samples[2]);
        log::debug!("flash size: {} KiB (nominal {} KiB)", size / 1024, nominal / 1024);
        Ok(size)
    }

    /// Read the first bytes of the flash information page
    pub fn read_info_page(&mut self) -> Result<[u8; 8]> {
        let mut info = [0u8; 8];
        self.write_config(commands::CONFIG_INFO_PAGE);
        let result = self.read_xdata(0x0000, &mut info);
        self.write_config(commands::CONFIG_MAIN_PAGE);
        result.map(|_| info)
    }

    /// Read the factory IEEE address of a CC253x part
    pub fn read_ieee_address(&mut self) -> Result<[u8; 8]> {
        let mut addr = [0u8; 8];
        self.read_xdata(regs::XDATA_IEEE_ADDRESS, &mut addr)?;
        Ok(addr)
    }

    /// Identify the target: model, lock state, flash size and IEEE address
    ///
    /// A locked part answers memory reads with zeros, so an all-zero info
    /// page is taken as locked and nothing else is read.
    pub fn identify(&mut self) -> Result<ChipIdentity> {
        let id = self.chip_id();
        let model = ChipModel::from_id(id.id);
        let info_page = self.read_info_page()?;
        let locked = info_page.iter().all(|&b| b == 0x00);

        let (flash_size, ieee_address) = if locked {
            (None, None)
        } else {
            let size = self.detect_flash_size()?;
            let ieee = if model.has_ieee_address() {
                Some(self.read_ieee_address()?)
            } else {
                None
            };
            (Some(size), ieee)
        };

        Ok(ChipIdentity {
            id,
            model,
            locked,
            flash_size,
            ieee_address,
            info_page,
        })
    }
}
