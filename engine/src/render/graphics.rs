//! Window surface presentation.
//!
//! Scenes are composited on the CPU into an RGBA [`Frame`](super::Frame); the
//! finished buffer is written straight into the surface texture with
//! `Queue::write_texture`, so no shaders or pipelines are involved.

use std::sync::Arc;

use winit::{dpi::PhysicalSize, event_loop::EventLoopProxy, window::Window};

use crate::error::{EngineError, Result};

pub type Rc<T> = Arc<T>;

/// What the graphics setup posts back to the event loop.
pub type GraphicsEvent = Result<Graphics>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelOrder {
    Rgba,
    Bgra,
}

pub struct Graphics {
    window: Rc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    channel_order: ChannelOrder,
    staging: Vec<u8>,
}

pub async fn create_graphics(window: Rc<Window>, proxy: EventLoopProxy<GraphicsEvent>) {
    let graphics = Graphics::new(window).await;
    if proxy.send_event(graphics).is_err() {
        log::error!("event loop closed before graphics were ready");
    }
}

impl Graphics {
    async fn new(window: Rc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tilescene device"),
                ..Default::default()
            })
            .await?;

        let caps = surface.get_capabilities(&adapter);
        if !caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
            return Err(EngineError::UnsupportedSurface("COPY_DST usage"));
        }
        let (format, channel_order) = caps
            .formats
            .iter()
            .find_map(|&format| channel_order(format).map(|order| (format, order)))
            .ok_or(EngineError::UnsupportedSurface("an 8-bit RGBA or BGRA format"))?;

        let mut surface_config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(EngineError::UnsupportedSurface("the selected adapter"))?;
        surface_config.format = format;
        surface_config.usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST;
        surface_config.view_formats = vec![];
        surface.configure(&device, &surface_config);

        Ok(Self {
            window,
            surface,
            surface_config,
            device,
            queue,
            channel_order,
            staging: Vec::new(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        // A zero-sized surface is invalid; minimised windows report 0x0.
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Uploads `pixels` to the window and presents it.
    ///
    /// Frames whose size no longer matches the surface (a resize landed
    /// between drawing and presenting) are dropped.
    pub fn present(&mut self, pixels: &image::RgbaImage) -> Result<()> {
        let (width, height) = pixels.dimensions();
        if (width, height) != self.size() {
            log::debug!("dropping {width}x{height} frame for {:?} surface", self.size());
            return Ok(());
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the surface texture");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let data: &[u8] = match self.channel_order {
            ChannelOrder::Rgba => pixels.as_raw(),
            ChannelOrder::Bgra => {
                self.staging.clear();
                self.staging.extend_from_slice(pixels.as_raw());
                for px in self.staging.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                &self.staging
            }
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &surface_texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        // Flushes the pending texture write before presenting.
        self.queue.submit(std::iter::empty());

        self.window.pre_present_notify();
        surface_texture.present();
        Ok(())
    }
}

fn channel_order(format: wgpu::TextureFormat) -> Option<ChannelOrder> {
    use wgpu::TextureFormat::*;
    match format {
        Rgba8Unorm | Rgba8UnormSrgb => Some(ChannelOrder::Rgba),
        Bgra8Unorm | Bgra8UnormSrgb => Some(ChannelOrder::Bgra),
        _ => None,
    }
}
