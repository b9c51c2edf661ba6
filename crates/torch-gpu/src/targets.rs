use torch_core::{Shape, SurfaceId};

use super::helpers;

pub(crate) const FEEDBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The two feedback surfaces. New textures start zeroed, so recreating
/// them also clears the feedback history.
pub(crate) struct FeedbackTargets {
    #[allow(dead_code)] // kept alongside its view
    pub(crate) a_tex: wgpu::Texture,
    pub(crate) a_view: wgpu::TextureView,
    #[allow(dead_code)]
    pub(crate) b_tex: wgpu::Texture,
    pub(crate) b_view: wgpu::TextureView,
}

impl FeedbackTargets {
    pub(crate) fn new(device: &wgpu::Device, shape: Shape) -> Self {
        let (a_tex, a_view) = create(device, "feedback_a", shape);
        let (b_tex, b_view) = create(device, "feedback_b", shape);
        Self {
            a_tex,
            a_view,
            b_tex,
            b_view,
        }
    }

    pub(crate) fn recreate(&mut self, device: &wgpu::Device, shape: Shape) {
        (self.a_tex, self.a_view) = create(device, "feedback_a", shape);
        (self.b_tex, self.b_view) = create(device, "feedback_b", shape);
    }

    /// View of a feedback surface; `None` for the screen.
    pub(crate) fn view(&self, id: SurfaceId) -> Option<&wgpu::TextureView> {
        match id {
            SurfaceId::FeedbackA => Some(&self.a_view),
            SurfaceId::FeedbackB => Some(&self.b_view),
            SurfaceId::Screen => None,
        }
    }
}

fn create(device: &wgpu::Device, label: &str, shape: Shape) -> (wgpu::Texture, wgpu::TextureView) {
    helpers::create_color_texture(
        device,
        label,
        shape.width,
        shape.height,
        FEEDBACK_FORMAT,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
    )
}
