//! Region, CCM, and memory-mapped-register configuration.
//!
//! Memory starts with every page mapped and fully accessible. The first
//! ICCM/DCCM/PIC definition that touches a region flips the whole region to
//! inaccessible, then carves out the defined window; only configured windows
//! of a configured region are usable. After all definitions,
//! [`Memory::finish_ccm_config`] applies the region-wide refinement that
//! matches the RTL: a region holding only instruction memory also serves
//! data, a region holding only data memory also serves fetch, and a mixed
//! region serves each strictly from its own sections.

use log::error;

use crate::attrib::PageAttribs;
use crate::error::MemoryError;
use crate::memory::Memory;

impl Memory {
    /// Defines an instruction closely-coupled memory window.
    ///
    /// Pages in the window become fetchable and readable and carry the ICCM
    /// tag. The window must be a whole number of pages, naturally aligned,
    /// and inside its region, and may not overlap a previously defined DCCM
    /// or PIC area.
    ///
    /// # Arguments
    ///
    /// * `region` - Region index the window lives in.
    /// * `offset` - Byte offset of the window within the region.
    /// * `size` - Window size in bytes (a multiple of the page size).
    pub fn define_iccm(
        &mut self,
        region: usize,
        offset: usize,
        size: usize,
    ) -> Result<(), MemoryError> {
        self.check_ccm_config("ICCM", region, offset, size)?;
        self.claim_ccm_pages("ICCM", region, offset, size, true, false, false)?;

        let addr = region * self.region_size() + offset;
        let ix = self.page_index(addr);
        for i in 0..size / self.page_size() {
            let attrib = &mut self.attribs[ix + i];
            attrib.set_exec(true);
            attrib.set_read(true);
            attrib.set_iccm(true);
        }
        Ok(())
    }

    /// Defines a data closely-coupled memory window.
    ///
    /// Pages in the window become readable and writable and carry the DCCM
    /// tag. Placement and overlap rules are as for
    /// [`define_iccm`](Memory::define_iccm).
    pub fn define_dccm(
        &mut self,
        region: usize,
        offset: usize,
        size: usize,
    ) -> Result<(), MemoryError> {
        self.check_ccm_config("DCCM", region, offset, size)?;
        self.claim_ccm_pages("DCCM", region, offset, size, false, true, false)?;

        let addr = region * self.region_size() + offset;
        let ix = self.page_index(addr);
        for i in 0..size / self.page_size() {
            let attrib = &mut self.attribs[ix + i];
            attrib.set_read(true);
            attrib.set_write(true);
            attrib.set_dccm(true);
        }
        Ok(())
    }

    /// Defines a window of memory-mapped (PIC) registers.
    ///
    /// Pages in the window become readable and writable word-by-word only,
    /// carry the memory-mapped-register tag, and start with no write masks
    /// (every word fully writable until a mask is defined).
    pub fn define_mem_mapped_register_region(
        &mut self,
        region: usize,
        offset: usize,
        size: usize,
    ) -> Result<(), MemoryError> {
        self.check_ccm_config("PIC memory", region, offset, size)?;
        self.claim_ccm_pages("PIC memory", region, offset, size, false, false, true)?;

        let addr = region * self.region_size() + offset;
        let mut ix = self.page_index(addr);
        for _ in 0..size / self.page_size() {
            self.mmr_pages.push(ix);
            let attrib = &mut self.attribs[ix];
            attrib.set_read(true);
            attrib.set_write(true);
            attrib.set_mem_mapped_reg(true);
            ix += 1;
        }
        Ok(())
    }

    /// Defines (or overrides) the write mask of one memory-mapped register.
    ///
    /// The register's word address is
    /// `region * region_size + region_offset + block_offset + register_ix * 4`.
    /// Fails if the PIC area at `region_offset` was never defined, if
    /// `block_offset` is not word-aligned, or if the resulting address falls
    /// outside a memory-mapped-register page.
    ///
    /// Defining the first mask of a page materializes that page's mask
    /// vector with all words masked to zero; registers keep all bits
    /// writable only while their page has no mask vector at all.
    pub fn define_mem_mapped_register_write_mask(
        &mut self,
        region: usize,
        region_offset: usize,
        block_offset: usize,
        register_ix: usize,
        mask: u32,
    ) -> Result<(), MemoryError> {
        let section_start = region * self.region_size() + region_offset;
        let section_ix = self.page_index(section_start);

        if section_ix >= self.page_count() || !self.attribs[section_ix].is_mapped() {
            return Err(self.bad_pic_register("PIC area does not exist", region, region_offset));
        }
        if !self.attribs[section_ix].is_mem_mapped_reg() {
            return Err(self.bad_pic_register(
                "area not defined for PIC registers",
                region,
                region_offset,
            ));
        }
        if block_offset & 3 != 0 {
            return Err(self.bad_pic_register(
                "PIC register offset not a multiple of 4",
                region,
                region_offset,
            ));
        }

        let register_addr = section_start + block_offset + register_ix * 4;
        let page_ix = self.page_index(register_addr);
        if page_ix >= self.page_count() || !self.attribs[page_ix].is_mem_mapped_reg() {
            return Err(self.bad_pic_register("PIC register out of bounds", region, region_offset));
        }

        if self.masks.is_empty() {
            self.masks = vec![Vec::new(); self.page_count()];
        }
        let word_count = self.page_size() / 4;
        let page_start = self.page_start(register_addr);
        let page_masks = &mut self.masks[page_ix];
        if page_masks.is_empty() {
            page_masks.resize(word_count, 0);
        }
        page_masks[(register_addr - page_start) / 4] = mask;
        Ok(())
    }

    /// Resets (to zero) every word of every memory-mapped-register page.
    pub fn reset_mem_mapped_registers(&mut self) {
        let page_size = self.page_size();
        for ix in 0..self.mmr_pages.len() {
            let page = self.mmr_pages[ix];
            self.data.fill_zero(page * page_size, page_size);
        }
    }

    /// Applies the region-wide access refinement after all CCM/PIC
    /// definitions are in.
    ///
    /// For each configured region: if it holds instruction sections but no
    /// data sections, every page in it becomes readable and writable; if it
    /// holds data sections but no instruction sections, every page becomes
    /// fetchable; if it holds both, instruction pages lose data access and
    /// data pages lose fetch access.
    pub fn finish_ccm_config(&mut self) {
        for region in 0..self.region_count() {
            if !self.region_configured[region] {
                continue;
            }

            let (first, last) = self.region_page_range(region);

            let mut has_data = false;
            let mut has_inst = false;
            for ix in first..last {
                let attrib = self.attribs[ix];
                has_data = has_data || attrib.is_write();
                has_inst = has_inst || attrib.is_exec();
            }

            if has_inst && has_data {
                for ix in first..last {
                    let attrib = &mut self.attribs[ix];
                    if attrib.is_exec() {
                        attrib.set_write(false);
                        attrib.set_read(false);
                    } else if attrib.is_write() {
                        attrib.set_exec(false);
                    }
                }
                continue;
            }

            if has_inst {
                for ix in first..last {
                    let attrib = &mut self.attribs[ix];
                    attrib.set_write(true);
                    attrib.set_read(true);
                }
            }
            if has_data {
                for ix in first..last {
                    self.attribs[ix].set_exec(true);
                }
            }
        }
    }

    /// Sets the write permission of the page containing `addr`. No-op if the
    /// address is out of bounds.
    pub fn set_write_access(&mut self, addr: usize, flag: bool) {
        let ix = self.page_index(addr);
        if ix < self.attribs.len() {
            self.attribs[ix].set_write(flag);
        }
    }

    /// Sets the read permission of the page containing `addr`. No-op if the
    /// address is out of bounds.
    pub fn set_read_access(&mut self, addr: usize, flag: bool) {
        let ix = self.page_index(addr);
        if ix < self.attribs.len() {
            self.attribs[ix].set_read(flag);
        }
    }

    /// Sets the exec permission of the page containing `addr`. No-op if the
    /// address is out of bounds.
    pub fn set_exec_access(&mut self, addr: usize, flag: bool) {
        let ix = self.page_index(addr);
        if ix < self.attribs.len() {
            self.attribs[ix].set_exec(flag);
        }
    }

    /// Validates placement of a CCM/PIC window: a known region, a size that
    /// is a whole number of pages, a window that fits its region, and a
    /// start address aligned to both the page size and the power of two
    /// covering the window size.
    fn check_ccm_config(
        &self,
        tag: &'static str,
        region: usize,
        offset: usize,
        size: usize,
    ) -> Result<(), MemoryError> {
        let fail = |reason: String| {
            error!("invalid {} definition: {}", tag, reason);
            Err(MemoryError::InvalidCcmConfig { tag, reason })
        };

        if region >= self.region_count() {
            return fail(format!(
                "region {} out of range; expecting 0 to {}",
                region,
                self.region_count() - 1
            ));
        }
        if size < self.page_size() || size % self.page_size() != 0 {
            return fail(format!(
                "size {:#x} is not a multiple of page size ({:#x})",
                size,
                self.page_size()
            ));
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.region_size() => {}
            _ => {
                return fail(format!(
                    "window [{:#x}, {:#x}+{:#x}) does not fit in a region of {:#x} bytes",
                    offset,
                    offset,
                    size,
                    self.region_size()
                ));
            }
        }

        let addr = region * self.region_size() + offset;
        if addr % self.page_size() != 0 {
            return fail(format!(
                "start address {:#x} is not page ({:#x}) aligned",
                addr,
                self.page_size()
            ));
        }

        // The window must be naturally aligned: the start address is a
        // multiple of the smallest power of two covering the window size.
        let natural = size.next_power_of_two();
        if addr % natural != 0 {
            return fail(format!(
                "start address {:#x} is not aligned to window size ({:#x})",
                addr, natural
            ));
        }

        Ok(())
    }

    /// Claims the pages of a CCM/PIC window. The first claim in a region
    /// unmaps the whole region before carving the window; later claims fail
    /// if any target page is already mapped for a different section kind.
    fn claim_ccm_pages(
        &mut self,
        tag: &'static str,
        region: usize,
        offset: usize,
        size: usize,
        iccm: bool,
        dccm: bool,
        pic: bool,
    ) -> Result<(), MemoryError> {
        if !self.region_configured[region] {
            self.region_configured[region] = true;
            let (first, last) = self.region_page_range(region);
            for ix in first..last {
                self.attribs[ix] = PageAttribs::default();
            }
            return Ok(());
        }

        let addr = region * self.region_size() + offset;
        let first = self.page_index(addr);
        let last = self.page_index(addr + size).min(self.attribs.len());
        for ix in first..last {
            let attrib = self.attribs[ix];
            if attrib.is_mapped()
                && ((iccm && !attrib.is_iccm())
                    || (dccm && !attrib.is_dccm())
                    || (pic && !attrib.is_mem_mapped_reg()))
            {
                error!(
                    "{} area at address {:#x} overlaps a previously defined area",
                    tag, addr
                );
                return Err(MemoryError::OverlapDefinition { tag, addr });
            }
        }
        Ok(())
    }

    /// Returns the attribute-table index range of the pages of `region`,
    /// clamped to the pages the memory actually has (the last region may
    /// extend past the end of a small memory).
    fn region_page_range(&self, region: usize) -> (usize, usize) {
        let first = self.page_index(region * self.region_size());
        let pages_per_region = self.region_size() / self.page_size();
        let last = (first + pages_per_region).min(self.attribs.len());
        (first, last)
    }

    /// Logs and builds the error for a bad PIC register definition.
    fn bad_pic_register(
        &self,
        reason: &str,
        region: usize,
        region_offset: usize,
    ) -> MemoryError {
        error!(
            "{}: region {:#x}, pic-base-offset {:#x}",
            reason, region, region_offset
        );
        MemoryError::InvalidCcmConfig {
            tag: "PIC memory",
            reason: reason.to_string(),
        }
    }
}
