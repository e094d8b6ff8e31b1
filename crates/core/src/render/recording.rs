use crate::{palette::Rgba, Result};

use super::{Paint, Surface};

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize {
        width: u32,
        height: u32,
    },
    ResetTransform,
    Scale {
        sx: f32,
        sy: f32,
    },
    SetAlpha(f32),
    SetShadow {
        blur: f32,
        color: Rgba,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        paint: Paint,
    },
    FillRoundRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        paint: Paint,
    },
    FillCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        paint: Paint,
    },
}

/// Surface that records draw calls instead of rasterising them.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    round_rect: bool,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            round_rect: true,
            ops: Vec::new(),
        }
    }

    /// Surface lacking the rounded-rectangle primitive.
    pub fn without_round_rect(width: u32, height: u32) -> Self {
        Self {
            round_rect: false,
            ..Self::new(width, height)
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl Surface for RecordingSurface {
    fn backing_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize_backing(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.ops.push(DrawOp::Resize { width, height });
        Ok(())
    }

    fn reset_transform(&mut self) {
        self.ops.push(DrawOp::ResetTransform);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.ops.push(DrawOp::Scale { sx, sy });
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ops.push(DrawOp::SetAlpha(alpha));
    }

    fn set_shadow(&mut self, blur: f32, color: Rgba) {
        self.ops.push(DrawOp::SetShadow { blur, color });
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: &Paint) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            paint: paint.clone(),
        });
    }

    fn fill_round_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        paint: &Paint,
    ) -> bool {
        if !self.round_rect {
            return false;
        }
        self.ops.push(DrawOp::FillRoundRect {
            x,
            y,
            width,
            height,
            radius,
            paint: paint.clone(),
        });
        true
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        self.ops.push(DrawOp::FillCircle {
            cx,
            cy,
            radius,
            paint: paint.clone(),
        });
    }
}
