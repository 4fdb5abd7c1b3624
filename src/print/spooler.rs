//! Windows print spooler path.
//!
//! Enumeration walks `EnumPrintersW` level 2 for names and status bits.
//! Submission opens a device context on the queue and draws the page with
//! GDI, so the printer driver rasterises it like any other application
//! output. All Win32 calls are synchronous and run on the blocking pool.

use super::{Platform, PrintAdapter, PrintJob, PrinterDescriptor, PrinterStatus, Submission};
use crate::error::BadgeResult;
#[cfg(not(windows))]
use crate::error::BadgeError;

// winspool PRINTER_STATUS_* bits that mean the queue will not print.
const STATUS_PAUSED: u32 = 0x0000_0001;
const STATUS_ERROR: u32 = 0x0000_0002;
const STATUS_OFFLINE: u32 = 0x0000_0080;
const STATUS_NOT_AVAILABLE: u32 = 0x0000_1000;

/// Map a spooler status word onto [`PrinterStatus`].
pub fn classify_status(bits: u32) -> PrinterStatus {
    if bits == 0 {
        PrinterStatus::Ready
    } else if bits & (STATUS_OFFLINE | STATUS_ERROR | STATUS_NOT_AVAILABLE | STATUS_PAUSED) != 0 {
        PrinterStatus::Offline
    } else {
        PrinterStatus::Unknown
    }
}

/// The Windows print spooler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpoolerAdapter;

impl PrintAdapter for SpoolerAdapter {
    fn platform(&self) -> Platform {
        Platform::Spooler
    }

    #[cfg(windows)]
    async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        tokio::task::spawn_blocking(win32::enumerate)
            .await
            .map_err(|e| crate::error::BadgeError::Enumeration(format!("Task join failed: {e}")))?
    }

    #[cfg(not(windows))]
    async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        Err(BadgeError::Enumeration(
            "The Windows print spooler is not available on this host".to_string(),
        ))
    }

    #[cfg(windows)]
    async fn submit(&self, job: &PrintJob) -> BadgeResult<Submission> {
        let printer = job.printer.clone();
        let title = job.document.title.clone();
        let page = PageSize {
            width_pt: job.document.page.width_pt,
            height_pt: job.document.page.height_pt,
        };
        let commands = super::gdi::flatten(&job.document.page);
        let join_printer = printer.clone();
        tokio::task::spawn_blocking(move || win32::draw(&printer, &title, page, &commands))
            .await
            .map_err(|e| {
                crate::error::BadgeError::submission(&join_printer, format!("Task join failed: {e}"))
            })?
    }

    #[cfg(not(windows))]
    async fn submit(&self, job: &PrintJob) -> BadgeResult<Submission> {
        Err(BadgeError::submission(
            &job.printer,
            "The Windows print spooler is not available on this host",
        ))
    }
}

#[cfg(windows)]
#[derive(Debug, Clone, Copy)]
struct PageSize {
    width_pt: f32,
    height_pt: f32,
}

#[cfg(windows)]
mod win32 {
    use std::mem::size_of;

    use windows::core::{w, PCWSTR, PWSTR};
    use windows::Win32::Foundation::{COLORREF, POINT};
    use windows::Win32::Graphics::Gdi::{
        CreateDCW, CreateFontW, CreatePen, CreateSolidBrush, DeleteDC, DeleteObject,
        GetDeviceCaps, GetStockObject, PolyPolygon, Polyline, SelectObject, SetBkMode,
        SetTextAlign, SetTextColor, TextOutW, ANSI_CHARSET, CLIP_DEFAULT_PRECIS,
        DEFAULT_QUALITY, FW_BOLD, FW_NORMAL, HDC, HGDIOBJ, LOGPIXELSX, LOGPIXELSY, NULL_PEN,
        OUT_TT_PRECIS, PHYSICALOFFSETX, PHYSICALOFFSETY, PS_SOLID, TA_BASELINE, TA_LEFT,
        TRANSPARENT,
    };
    use windows::Win32::Graphics::Printing::{
        EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_2W,
    };
    use windows::Win32::Storage::Xps::{AbortDoc, EndDoc, EndPage, StartDocW, StartPage, DOCINFOW};

    use super::{classify_status, PageSize};
    use crate::error::{BadgeError, BadgeResult};
    use crate::fonts::FontFace;
    use crate::print::gdi::{colorref, escapement, DeviceMapping, DrawCommand, PagePoint};
    use crate::print::{PrinterDescriptor, Submission};

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn last_error() -> String {
        std::io::Error::last_os_error().to_string()
    }

    pub(super) fn enumerate() -> BadgeResult<Vec<PrinterDescriptor>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed: u32 = 0;
        let mut returned: u32 = 0;

        unsafe {
            let _ = EnumPrintersW(flags, None, 2, None, &mut needed, &mut returned);
            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                2,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|e| BadgeError::Enumeration(format!("EnumPrintersW failed: {e}")))?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_2W;
            let infos = std::slice::from_raw_parts(ptr, returned as usize);

            Ok(infos
                .iter()
                .filter(|info| !info.pPrinterName.is_null())
                .map(|info| {
                    let name = PWSTR(info.pPrinterName.0).to_string().unwrap_or_default();
                    PrinterDescriptor::new(name, classify_status(info.Status))
                })
                .collect())
        }
    }

    /// Deletes the printer device context.
    struct DcGuard(HDC);

    impl Drop for DcGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = DeleteDC(self.0);
            }
        }
    }

    /// Aborts the print job unless it was ended.
    struct DocGuard {
        hdc: HDC,
        active: bool,
    }

    impl DocGuard {
        fn end(&mut self) -> Result<(), String> {
            self.active = false;
            if unsafe { EndDoc(self.hdc) } <= 0 {
                return Err(format!("EndDoc failed: {}", last_error()));
            }
            Ok(())
        }
    }

    impl Drop for DocGuard {
        fn drop(&mut self) {
            if self.active {
                unsafe {
                    let _ = AbortDoc(self.hdc);
                }
            }
        }
    }

    /// Keeps a GDI object selected into the DC; on drop the previous object
    /// is selected back and ours is deleted unless it is a stock object.
    struct Selected {
        hdc: HDC,
        previous: HGDIOBJ,
        object: HGDIOBJ,
        owned: bool,
    }

    impl Selected {
        unsafe fn new(hdc: HDC, object: HGDIOBJ, owned: bool, what: &str) -> Result<Self, String> {
            if object.is_invalid() {
                return Err(format!("{what} failed: {}", last_error()));
            }
            let previous = SelectObject(hdc, object);
            Ok(Self {
                hdc,
                previous,
                object,
                owned,
            })
        }
    }

    impl Drop for Selected {
        fn drop(&mut self) {
            unsafe {
                let _ = SelectObject(self.hdc, self.previous);
                if self.owned {
                    let _ = DeleteObject(self.object);
                }
            }
        }
    }

    fn device_points(mapping: &DeviceMapping, points: &[PagePoint]) -> Vec<POINT> {
        points
            .iter()
            .map(|p| {
                let (x, y) = mapping.point(*p);
                POINT { x, y }
            })
            .collect()
    }

    unsafe fn draw_command(
        hdc: HDC,
        mapping: &DeviceMapping,
        command: &DrawCommand,
    ) -> Result<(), String> {
        match command {
            DrawCommand::Fill { rings, color } => {
                let brush = CreateSolidBrush(COLORREF(colorref(*color)));
                let _brush = Selected::new(hdc, brush.into(), true, "CreateSolidBrush")?;
                let _pen = Selected::new(hdc, GetStockObject(NULL_PEN), false, "GetStockObject")?;
                let mut points = Vec::new();
                let mut counts = Vec::with_capacity(rings.len());
                for ring in rings.iter().filter(|r| r.len() >= 3) {
                    points.extend(device_points(mapping, ring));
                    counts.push(ring.len() as i32);
                }
                if counts.is_empty() {
                    return Ok(());
                }
                if !PolyPolygon(hdc, points.as_ptr(), &counts).as_bool() {
                    return Err(format!("PolyPolygon failed: {}", last_error()));
                }
            }
            DrawCommand::Stroke {
                points,
                closed,
                width,
                color,
            } => {
                let pen = CreatePen(PS_SOLID, mapping.pen_width(*width), COLORREF(colorref(*color)));
                let _pen = Selected::new(hdc, pen.into(), true, "CreatePen")?;
                let mut device = device_points(mapping, points);
                if *closed {
                    if let Some(first) = device.first().copied() {
                        device.push(first);
                    }
                }
                if device.len() >= 2 && !Polyline(hdc, &device).as_bool() {
                    return Err(format!("Polyline failed: {}", last_error()));
                }
            }
            DrawCommand::Text {
                origin,
                text,
                size,
                face,
                angle,
                color,
            } => {
                let weight = match face {
                    FontFace::Bold => FW_BOLD,
                    FontFace::Regular | FontFace::Oblique => FW_NORMAL,
                };
                let italic = u32::from(*face == FontFace::Oblique);
                let tilt = escapement(*angle);
                // Negative height selects by em size, which is what a PDF font size is.
                let font = CreateFontW(
                    -mapping.font_height(*size),
                    0,
                    tilt,
                    tilt,
                    weight.0 as i32,
                    italic,
                    0,
                    0,
                    ANSI_CHARSET,
                    OUT_TT_PRECIS,
                    CLIP_DEFAULT_PRECIS,
                    DEFAULT_QUALITY,
                    0,
                    w!("Arial"),
                );
                let _font = Selected::new(hdc, font.into(), true, "CreateFontW")?;
                SetTextColor(hdc, COLORREF(colorref(*color)));
                let (x, y) = mapping.point(*origin);
                let wide: Vec<u16> = text.encode_utf16().collect();
                if !TextOutW(hdc, x, y, &wide).as_bool() {
                    return Err(format!("TextOutW failed: {}", last_error()));
                }
            }
        }
        Ok(())
    }

    /// Draw one page on `printer` and return the spooler job id.
    pub(super) fn draw(
        printer: &str,
        title: &str,
        page: PageSize,
        commands: &[DrawCommand],
    ) -> BadgeResult<Submission> {
        let name_w = to_wide(printer);
        let doc_w = to_wide(title);
        let fail = |message: String| BadgeError::submission(printer, message);

        unsafe {
            let hdc = CreateDCW(
                w!("WINSPOOL"),
                PCWSTR::from_raw(name_w.as_ptr()),
                PCWSTR::null(),
                None,
            );
            if hdc.is_invalid() {
                return Err(fail(format!("CreateDCW failed: {}", last_error())));
            }
            let _dc = DcGuard(hdc);

            let mapping = DeviceMapping::new(
                GetDeviceCaps(Some(hdc), LOGPIXELSX),
                GetDeviceCaps(Some(hdc), LOGPIXELSY),
                GetDeviceCaps(Some(hdc), PHYSICALOFFSETX),
                GetDeviceCaps(Some(hdc), PHYSICALOFFSETY),
            );
            log::debug!(
                "Drawing {:.0}x{:.0}pt page on '{printer}' at {mapping:?}",
                page.width_pt,
                page.height_pt
            );

            let di = DOCINFOW {
                cbSize: size_of::<DOCINFOW>() as i32,
                lpszDocName: PCWSTR::from_raw(doc_w.as_ptr()),
                ..Default::default()
            };
            let job_id = StartDocW(hdc, &di);
            if job_id <= 0 {
                return Err(fail(format!("StartDoc failed: {}", last_error())));
            }
            let mut doc = DocGuard { hdc, active: true };

            if StartPage(hdc) <= 0 {
                return Err(fail(format!("StartPage failed: {}", last_error())));
            }
            SetBkMode(hdc, TRANSPARENT);
            SetTextAlign(hdc, TA_BASELINE | TA_LEFT);
            for command in commands {
                draw_command(hdc, &mapping, command).map_err(fail)?;
            }
            if EndPage(hdc) <= 0 {
                return Err(fail(format!("EndPage failed: {}", last_error())));
            }
            doc.end().map_err(fail)?;

            Ok(Submission {
                job_id: Some(job_id.to_string()),
                raw: format!("spooler job {job_id}"),
            })
        }
    }
}
