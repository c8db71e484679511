//! Prescription document layout.
//!
//! Rendering is split in two. [`render_prescription`] lays the sections out into a [`Document`],
//! a page-by-page list of positioned elements, and reports which optional parts were drawn or
//! skipped. [`pdf::write_pdf`] then paints that document with printpdf.
//!
//! Nothing in here fails on bad content: unreadable images and empty sections are recorded as
//! [`SectionOutcome::Skipped`] and the rest of the document is laid out as usual.

pub mod layout;
pub mod pdf;
pub mod sections;
pub mod style;

use crate::image::{decode_image, DecodedImage, ImageFormat, NoImage};
use crate::records::{Hospital, Patient, Visit};
use chrono::{DateTime, Utc};
use clinic_types::NonEmptyText;
use layout::Canvas;
use printpdf::image_crate;
use style::Theme;

pub use layout::LayoutContext;
pub use style::{Font, Rgb};

/// Images larger than this on either side are downscaled before embedding.
const MAX_IMAGE_PX: u32 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub x: f32,
    /// Baseline, measured from the top of the page.
    pub y: f32,
    pub size: f32,
    pub font: Font,
    pub color: Rgb,
    pub text: String,
}

/// A positioned drawing primitive. Coordinates are points from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(TextBlock),
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
        width: f32,
    },
    /// Index into [`Document::images`].
    Image {
        image: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

/// A decoded raster, flattened onto white and ready for embedding.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub format: ImageFormat,
    pub pixels: image_crate::RgbImage,
}

impl RasterImage {
    pub fn from_decoded(decoded: &DecodedImage) -> Result<Self, SkipReason> {
        if decoded.format.likely_unsupported() {
            return Err(SkipReason::UnsupportedFormat(decoded.format));
        }

        let mut dynamic = image_crate::load_from_memory(&decoded.bytes)
            .map_err(|e| SkipReason::EmbedFailed(e.to_string()))?;
        if dynamic.width() > MAX_IMAGE_PX || dynamic.height() > MAX_IMAGE_PX {
            dynamic = dynamic.thumbnail(MAX_IMAGE_PX, MAX_IMAGE_PX);
        }

        let rgba = dynamic.to_rgba8();
        let pixels = image_crate::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let p = rgba.get_pixel(x, y);
            let alpha = p[3] as u16;
            let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
            image_crate::Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
        });

        Ok(Self {
            format: decoded.format,
            pixels,
        })
    }
}

/// Handle to an image registered with the document being laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub index: usize,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub author: String,
    pub pages: Vec<Page>,
    pub images: Vec<RasterImage>,
}

impl Document {
    /// All text drawn in the document, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                Element::Text(block) => Some(block.text.as_str()),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    Logo,
    Title,
    PatientInfo,
    Symptoms,
    Diagnosis,
    Prescription,
    DoctorNotes,
    Signature,
    SignatureImage,
    Footer,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Header => "header",
            Section::Logo => "logo",
            Section::Title => "title",
            Section::PatientInfo => "patientInfo",
            Section::Symptoms => "symptoms",
            Section::Diagnosis => "diagnosis",
            Section::Prescription => "prescription",
            Section::DoctorNotes => "doctorNotes",
            Section::Signature => "signature",
            Section::SignatureImage => "signatureImage",
            Section::Footer => "footer",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Section::Symptoms => "SYMPTOMS",
            Section::Diagnosis => "DIAGNOSIS",
            Section::DoctorNotes => "DOCTOR'S NOTES",
            _ => "",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotProvided,
    NoImage(NoImage),
    UnsupportedFormat(ImageFormat),
    EmbedFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotProvided => f.write_str("not provided"),
            SkipReason::NoImage(reason) => write!(f, "{reason}"),
            SkipReason::UnsupportedFormat(format) => write!(f, "unsupported image format: {format}"),
            SkipReason::EmbedFailed(message) => write!(f, "image could not be embedded: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Rendered,
    Skipped(SkipReason),
}

/// What was drawn, in layout order.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub sections: Vec<(Section, SectionOutcome)>,
    /// Prescription entries as printed, after numbering.
    pub prescription_items: Vec<String>,
    pub page_count: usize,
}

impl RenderReport {
    fn record(&mut self, section: Section, outcome: SectionOutcome) {
        self.sections.push((section, outcome));
    }

    pub fn outcome(&self, section: Section) -> Option<&SectionOutcome> {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, outcome)| outcome)
    }

    pub fn is_rendered(&self, section: Section) -> bool {
        matches!(self.outcome(section), Some(SectionOutcome::Rendered))
    }
}

/// Inputs for one prescription document.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Source of the prescription entries, one per non-empty line.
    pub prescription: &'a str,
    pub patient: &'a Patient,
    pub hospital: &'a Hospital,
    pub visit: &'a Visit,
    pub platform_name: &'a str,
    pub generated_at: DateTime<Utc>,
}

/// Lay out a prescription document.
///
/// The same request always produces the same pages.
pub fn render_prescription(request: &RenderRequest<'_>) -> (Document, RenderReport) {
    let RenderRequest {
        prescription,
        patient,
        hospital,
        visit,
        platform_name,
        generated_at,
    } = *request;

    let theme = Theme::from_primary(
        hospital
            .branding
            .primary_color
            .as_ref()
            .map(NonEmptyText::as_str),
    );
    let mut canvas = Canvas::new(&theme);
    let mut images = Vec::new();
    let mut report = RenderReport::default();

    let logo = load_image(hospital.branding.logo.as_ref(), &mut images);
    let ctx = canvas.start();
    let ctx = sections::header(&mut canvas, ctx, &theme, hospital, logo.as_ref().ok().copied());
    report.record(Section::Header, SectionOutcome::Rendered);
    report.record(Section::Logo, image_outcome(Section::Logo, logo));

    let ctx = sections::title_band(&mut canvas, ctx, &theme);
    report.record(Section::Title, SectionOutcome::Rendered);

    let date = generated_at.format("%d/%m/%Y").to_string();
    let ctx = sections::patient_card(&mut canvas, ctx, &theme, patient, &date);
    report.record(Section::PatientInfo, SectionOutcome::Rendered);

    let ctx = optional_section(
        &mut canvas,
        ctx,
        &theme,
        &mut report,
        Section::Symptoms,
        visit.symptoms.as_ref(),
    );
    let ctx = optional_section(
        &mut canvas,
        ctx,
        &theme,
        &mut report,
        Section::Diagnosis,
        visit.diagnosis.as_ref(),
    );

    let items = sections::prescription_items(prescription);
    let ctx = sections::prescription_section(&mut canvas, ctx, &theme, &items);
    report.record(Section::Prescription, SectionOutcome::Rendered);
    report.prescription_items = items;

    let ctx = optional_section(
        &mut canvas,
        ctx,
        &theme,
        &mut report,
        Section::DoctorNotes,
        visit.doctor_notes.as_ref(),
    );

    let signature = load_image(hospital.doctor_signature.as_ref(), &mut images);
    sections::signature_card(&mut canvas, ctx, &theme, hospital, signature.as_ref().ok().copied());
    report.record(Section::Signature, SectionOutcome::Rendered);
    report.record(Section::SignatureImage, image_outcome(Section::SignatureImage, signature));

    let timestamp = generated_at.format("%d/%m/%Y %H:%M:%S UTC").to_string();
    sections::footer(&mut canvas, platform_name, &timestamp, &patient.id);
    report.record(Section::Footer, SectionOutcome::Rendered);

    let pages = canvas.into_pages();
    report.page_count = pages.len();

    let document = Document {
        title: format!("Prescription for {}", patient.name.trim()),
        author: hospital.signatory().to_string(),
        pages,
        images,
    };
    (document, report)
}

fn optional_section(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    report: &mut RenderReport,
    section: Section,
    body: Option<&NonEmptyText>,
) -> LayoutContext {
    match body {
        Some(body) => {
            report.record(section, SectionOutcome::Rendered);
            sections::text_section(canvas, ctx, theme, section.heading(), body.as_str())
        }
        None => {
            report.record(section, SectionOutcome::Skipped(SkipReason::NotProvided));
            ctx
        }
    }
}

fn load_image(
    source: Option<&NonEmptyText>,
    images: &mut Vec<RasterImage>,
) -> Result<ImageRef, SkipReason> {
    let source = source.ok_or(SkipReason::NotProvided)?;
    let decoded = decode_image(source.as_str()).map_err(SkipReason::NoImage)?;
    let raster = RasterImage::from_decoded(&decoded)?;

    let (width_px, height_px) = raster.pixels.dimensions();
    images.push(raster);
    Ok(ImageRef {
        index: images.len() - 1,
        width_px,
        height_px,
    })
}

fn image_outcome(section: Section, result: Result<ImageRef, SkipReason>) -> SectionOutcome {
    match result {
        Ok(_) => SectionOutcome::Rendered,
        Err(SkipReason::NotProvided) => SectionOutcome::Skipped(SkipReason::NotProvided),
        Err(reason) => {
            if matches!(reason, SkipReason::UnsupportedFormat(_)) {
                tracing::info!("{section} skipped: {reason}");
            } else {
                tracing::warn!("{section} skipped: {reason}");
            }
            SectionOutcome::Skipped(reason)
        }
    }
}
