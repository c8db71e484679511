//! Section renderers.
//!
//! Each renderer receives the layout context by value and returns the context below what it drew.

use super::layout::{
    Canvas, LayoutContext, BORDER_INSET, CONTENT_LEFT, CONTENT_RIGHT, CONTENT_WIDTH, PAGE_HEIGHT,
    PAGE_WIDTH, SAFE_BOTTOM, SECTION_GAP,
};
use super::style::{
    text_width, truncate_to_width, wrap_text, Font, Rgb, Theme, BORDER, TEXT_DARK, TEXT_FAINT,
    TEXT_MUTED,
};
use super::{Element, ImageRef, TextBlock};
use crate::constants::PRESCRIPTION_TITLE;
use crate::records::{Hospital, Patient};

const HEADER_HEIGHT: f32 = 120.0;
const LOGO_X: f32 = 40.0;
const LOGO_OFFSET_Y: f32 = 15.0;
const LOGO_BOX: f32 = 80.0;

const TITLE_HEIGHT: f32 = 32.0;
const TITLE_SIZE: f32 = 16.0;

const CARD_HEIGHT: f32 = 70.0;
const STRIP_HEIGHT: f32 = 20.0;

const BODY_SIZE: f32 = 10.0;
const BODY_PADDING: f32 = 12.0;
const MIN_BODY_HEIGHT: f32 = 30.0;
const LINE_HEIGHT: f32 = 14.0;
const BODY_INSET: f32 = 10.0;

const ROW_HEIGHT: f32 = 20.0;
const CONTINUATION_INDENT: f32 = 15.0;

const SIGNATURE_WIDTH: f32 = 220.0;
const SIGNATURE_HEIGHT: f32 = 130.0;
const SIGNATURE_IMAGE_WIDTH: f32 = 160.0;
const SIGNATURE_IMAGE_HEIGHT: f32 = 48.0;

const FOOTER_OFFSET: f32 = 60.0;
const FOOTER_SIZE: f32 = 8.0;

pub const NO_PRESCRIPTION_PLACEHOLDER: &str = "No prescription provided";

/// One line of text at a baseline.
#[allow(clippy::too_many_arguments)]
fn text(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    x: f32,
    baseline: f32,
    size: f32,
    font: Font,
    color: Rgb,
    content: impl Into<String>,
) {
    canvas.push(
        ctx,
        Element::Text(TextBlock {
            x,
            y: baseline,
            size,
            font,
            color,
            text: content.into(),
        }),
    );
}

fn centered(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    baseline: f32,
    size: f32,
    font: Font,
    color: Rgb,
    content: &str,
) {
    let x = CONTENT_LEFT + ((CONTENT_WIDTH - text_width(content, size, font)) / 2.0).max(0.0);
    text(canvas, ctx, x, baseline, size, font, color, content);
}

/// Scale `image` into the box, keeping its aspect ratio, centred.
fn fit_image(image: ImageRef, x: f32, y: f32, w: f32, h: f32) -> Element {
    let width = image.width_px.max(1) as f32;
    let height = image.height_px.max(1) as f32;
    let scale = (w / width).min(h / height);
    let (dw, dh) = (width * scale, height * scale);
    Element::Image {
        image: image.index,
        x: x + (w - dw) / 2.0,
        y: y + (h - dh) / 2.0,
        w: dw,
        h: dh,
    }
}

/// Bordered box with a tinted title strip along its top.
fn titled_box(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    x: f32,
    width: f32,
    height: f32,
    title: &str,
) {
    let top = ctx.cursor;
    canvas.push(
        ctx,
        Element::Rect {
            x,
            y: top,
            w: width,
            h: STRIP_HEIGHT,
            fill: Some(theme.header_tint),
            stroke: None,
        },
    );
    canvas.push(
        ctx,
        Element::Rect {
            x,
            y: top,
            w: width,
            h: height,
            fill: None,
            stroke: Some((BORDER, 1.0)),
        },
    );
    text(canvas, ctx, x + BODY_INSET, top + 14.0, 10.0, Font::Bold, theme.accent_text, title);
}

/// Draw `rows` inside titled boxes, continuing onto new pages when they run past the safe area.
fn boxed_rows<T>(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    title: &str,
    rows: &[T],
    row_height: f32,
    mut draw_row: impl FnMut(&mut Canvas, LayoutContext, &T, f32),
) -> LayoutContext {
    let mut ctx = canvas.ensure_space(ctx, STRIP_HEIGHT + MIN_BODY_HEIGHT);
    let mut remaining = rows;
    let mut heading = title.to_string();

    loop {
        let available = SAFE_BOTTOM - ctx.cursor - STRIP_HEIGHT - BODY_PADDING;
        let fit = ((available / row_height).floor().max(1.0) as usize).min(remaining.len());
        let (chunk, rest) = remaining.split_at(fit);

        let body = (chunk.len() as f32 * row_height + BODY_PADDING).max(MIN_BODY_HEIGHT);
        titled_box(canvas, ctx, theme, CONTENT_LEFT, CONTENT_WIDTH, STRIP_HEIGHT + body, &heading);

        let first_baseline = ctx.cursor + STRIP_HEIGHT + BODY_PADDING / 2.0 + row_height * 0.75;
        for (i, row) in chunk.iter().enumerate() {
            draw_row(canvas, ctx, row, first_baseline + i as f32 * row_height);
        }

        ctx = ctx.advance(STRIP_HEIGHT + body + SECTION_GAP);
        if rest.is_empty() {
            return ctx;
        }

        remaining = rest;
        ctx = canvas.new_page();
        heading = format!("{title} (continued)");
    }
}

pub fn header(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    hospital: &Hospital,
    logo: Option<ImageRef>,
) -> LayoutContext {
    let top = ctx.cursor;
    canvas.push(
        ctx,
        Element::Rect {
            x: BORDER_INSET,
            y: top,
            w: PAGE_WIDTH - 2.0 * BORDER_INSET,
            h: HEADER_HEIGHT,
            fill: Some(theme.header_tint),
            stroke: None,
        },
    );

    let text_x = match logo {
        Some(image) => {
            canvas.push(ctx, fit_image(image, LOGO_X, top + LOGO_OFFSET_Y, LOGO_BOX, LOGO_BOX));
            LOGO_X + LOGO_BOX + 15.0
        }
        None => CONTENT_LEFT,
    };
    let max_width = CONTENT_RIGHT - text_x;

    let name = truncate_to_width(hospital.name.trim(), max_width, 20.0, Font::Bold);
    text(canvas, ctx, text_x, top + 40.0, 20.0, Font::Bold, theme.accent_text, name);

    let address = hospital.address.trim();
    if !address.is_empty() {
        let address = truncate_to_width(address, max_width, 10.0, Font::Regular);
        text(canvas, ctx, text_x, top + 60.0, 10.0, Font::Regular, TEXT_MUTED, address);
    }

    let mut contact = Vec::new();
    let phone = hospital.phone_number.trim();
    if !phone.is_empty() {
        contact.push(format!("Phone: {phone}"));
    }
    if let Some(email) = &hospital.email {
        contact.push(format!("Email: {email}"));
    }
    if !contact.is_empty() {
        let line = truncate_to_width(&contact.join(" | "), max_width, 10.0, Font::Regular);
        text(canvas, ctx, text_x, top + 75.0, 10.0, Font::Regular, TEXT_MUTED, line);
    }

    if let Some(letterhead) = &hospital.branding.letterhead_text {
        let quote = truncate_to_width(letterhead.as_str(), max_width, 9.0, Font::Italic);
        text(canvas, ctx, text_x, top + 92.0, 9.0, Font::Italic, TEXT_FAINT, quote);
    }

    ctx.advance(HEADER_HEIGHT + SECTION_GAP)
}

pub fn title_band(canvas: &mut Canvas, ctx: LayoutContext, theme: &Theme) -> LayoutContext {
    canvas.push(
        ctx,
        Element::Rect {
            x: CONTENT_LEFT,
            y: ctx.cursor,
            w: CONTENT_WIDTH,
            h: TITLE_HEIGHT,
            fill: Some(theme.primary),
            stroke: None,
        },
    );
    centered(
        canvas,
        ctx,
        ctx.cursor + 21.0,
        TITLE_SIZE,
        Font::Bold,
        theme.on_primary(),
        PRESCRIPTION_TITLE,
    );
    ctx.advance(TITLE_HEIGHT + SECTION_GAP)
}

fn or_dash(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub fn patient_card(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    patient: &Patient,
    date: &str,
) -> LayoutContext {
    let top = ctx.cursor;
    titled_box(canvas, ctx, theme, CONTENT_LEFT, CONTENT_WIDTH, CARD_HEIGHT, "PATIENT INFORMATION");

    let left = CONTENT_LEFT + BODY_INSET;
    let right = CONTENT_LEFT + 290.0;
    let row_one = top + 38.0;
    let row_two = top + 56.0;

    let name = truncate_to_width(
        &format!("Name: {}", or_dash(&patient.name)),
        right - left - 10.0,
        BODY_SIZE,
        Font::Regular,
    );
    text(canvas, ctx, left, row_one, BODY_SIZE, Font::Regular, TEXT_DARK, name);
    text(canvas, ctx, right, row_one, BODY_SIZE, Font::Regular, TEXT_DARK, format!("Date: {date}"));

    text(
        canvas,
        ctx,
        left,
        row_two,
        BODY_SIZE,
        Font::Regular,
        TEXT_DARK,
        format!("Age: {} years", patient.age),
    );
    text(
        canvas,
        ctx,
        CONTENT_LEFT + 150.0,
        row_two,
        BODY_SIZE,
        Font::Regular,
        TEXT_DARK,
        format!("Gender: {}", or_dash(&patient.gender)),
    );
    let contact = truncate_to_width(
        &format!("Contact: {}", or_dash(&patient.contact_number)),
        CONTENT_RIGHT - right - BODY_INSET,
        BODY_SIZE,
        Font::Regular,
    );
    text(canvas, ctx, right, row_two, BODY_SIZE, Font::Regular, TEXT_DARK, contact);

    ctx.advance(CARD_HEIGHT + SECTION_GAP)
}

/// Free-text section (symptoms, diagnosis, notes) sized to its wrapped content.
pub fn text_section(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    title: &str,
    body: &str,
) -> LayoutContext {
    let lines = wrap_text(body, CONTENT_WIDTH - 2.0 * BODY_INSET, BODY_SIZE, Font::Regular);
    boxed_rows(canvas, ctx, theme, title, &lines, LINE_HEIGHT, |canvas, ctx, line, baseline| {
        text(
            canvas,
            ctx,
            CONTENT_LEFT + BODY_INSET,
            baseline,
            BODY_SIZE,
            Font::Regular,
            TEXT_DARK,
            line.as_str(),
        );
    })
}

/// Numbered entries from prescription text, one per non-empty line.
///
/// Lines already starting with a number and a period are kept as written; the rest are numbered
/// by their position among the non-empty lines.
pub fn prescription_items(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            if is_numbered(line) {
                line.to_string()
            } else {
                format!("{}. {line}", i + 1)
            }
        })
        .collect()
}

fn is_numbered(line: &str) -> bool {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}

enum RxRow {
    Item(String),
    Continuation(String),
    Placeholder,
}

pub fn prescription_section(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    items: &[String],
) -> LayoutContext {
    let item_width = CONTENT_WIDTH - 2.0 * BODY_INSET - CONTINUATION_INDENT;
    let mut rows = Vec::new();
    for item in items {
        let mut wrapped = wrap_text(item, item_width, BODY_SIZE, Font::Regular).into_iter();
        if let Some(first) = wrapped.next() {
            rows.push(RxRow::Item(first));
        }
        rows.extend(wrapped.map(RxRow::Continuation));
    }
    if rows.is_empty() {
        rows.push(RxRow::Placeholder);
    }

    boxed_rows(
        canvas,
        ctx,
        theme,
        "PRESCRIPTION (Rx)",
        &rows,
        ROW_HEIGHT,
        |canvas, ctx, row, baseline| {
            let left = CONTENT_LEFT + BODY_INSET;
            match row {
                RxRow::Item(line) => {
                    text(canvas, ctx, left, baseline, BODY_SIZE, Font::Regular, TEXT_DARK, line.as_str())
                }
                RxRow::Continuation(line) => text(
                    canvas,
                    ctx,
                    left + CONTINUATION_INDENT,
                    baseline,
                    BODY_SIZE,
                    Font::Regular,
                    TEXT_DARK,
                    line.as_str(),
                ),
                RxRow::Placeholder => text(
                    canvas,
                    ctx,
                    left,
                    baseline,
                    BODY_SIZE,
                    Font::Italic,
                    TEXT_MUTED,
                    NO_PRESCRIPTION_PLACEHOLDER,
                ),
            }
        },
    )
}

pub fn signature_card(
    canvas: &mut Canvas,
    ctx: LayoutContext,
    theme: &Theme,
    hospital: &Hospital,
    signature: Option<ImageRef>,
) -> LayoutContext {
    let ctx = canvas.ensure_space(ctx, SIGNATURE_HEIGHT);
    let top = ctx.cursor;
    let x = CONTENT_RIGHT - SIGNATURE_WIDTH;
    titled_box(canvas, ctx, theme, x, SIGNATURE_WIDTH, SIGNATURE_HEIGHT, "DOCTOR'S SIGNATURE");

    let image_x = x + (SIGNATURE_WIDTH - SIGNATURE_IMAGE_WIDTH) / 2.0;
    match signature {
        Some(image) => canvas.push(
            ctx,
            fit_image(
                image,
                image_x,
                top + STRIP_HEIGHT + 6.0,
                SIGNATURE_IMAGE_WIDTH,
                SIGNATURE_IMAGE_HEIGHT,
            ),
        ),
        None => canvas.push(
            ctx,
            Element::Rule {
                x1: image_x,
                y1: top + 70.0,
                x2: image_x + SIGNATURE_IMAGE_WIDTH,
                y2: top + 70.0,
                color: TEXT_FAINT,
                width: 0.75,
            },
        ),
    }

    let text_x = x + 15.0;
    let max_width = SIGNATURE_WIDTH - 30.0;
    let name = truncate_to_width(hospital.signatory().trim(), max_width, BODY_SIZE, Font::Bold);
    text(canvas, ctx, text_x, top + 90.0, BODY_SIZE, Font::Bold, TEXT_DARK, name);

    if let Some(designation) = &hospital.doctor_designation {
        let designation = truncate_to_width(designation.as_str(), max_width, 9.0, Font::Regular);
        text(canvas, ctx, text_x, top + 104.0, 9.0, Font::Regular, TEXT_MUTED, designation);
    }
    if let Some(registration) = &hospital.doctor_registration_number {
        let registration =
            truncate_to_width(&format!("Reg. No: {registration}"), max_width, 9.0, Font::Regular);
        text(canvas, ctx, text_x, top + 118.0, 9.0, Font::Regular, TEXT_MUTED, registration);
    }

    ctx.advance(SIGNATURE_HEIGHT + SECTION_GAP)
}

/// Last eight characters of the patient identifier.
pub fn prescription_id(patient_id: &str) -> String {
    let chars: Vec<char> = patient_id.chars().collect();
    chars[chars.len().saturating_sub(8)..].iter().collect()
}

/// Footer band below the safe area. Every page carries the attribution line; the generated
/// line with the timestamp and prescription id goes on the final page.
pub fn footer(canvas: &mut Canvas, platform_name: &str, generated_at: &str, patient_id: &str) {
    let attribution = truncate_to_width(
        &format!("This is a digital prescription generated by {platform_name}."),
        CONTENT_WIDTH,
        FOOTER_SIZE,
        Font::Regular,
    );
    let generated = format!(
        "Generated on {generated_at} | Prescription ID: {}",
        prescription_id(patient_id)
    );

    let last = canvas.last_page();
    for page in 0..=last {
        let ctx = LayoutContext {
            cursor: PAGE_HEIGHT - FOOTER_OFFSET,
            page,
        };
        canvas.push(
            ctx,
            Element::Rule {
                x1: CONTENT_LEFT,
                y1: ctx.cursor,
                x2: CONTENT_RIGHT,
                y2: ctx.cursor,
                color: BORDER,
                width: 0.75,
            },
        );
        centered(canvas, ctx, ctx.cursor + 15.0, FOOTER_SIZE, Font::Regular, TEXT_FAINT, &attribution);

        if page == last {
            centered(canvas, ctx, ctx.cursor + 27.0, FOOTER_SIZE, Font::Regular, TEXT_FAINT, &generated);
        }
    }
}
