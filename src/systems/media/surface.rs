use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
};

use super::VideoFrame;

const BLANK_PIXEL: [u8; 4] = [17, 17, 17, 255];

/// Sent once per attached stream, when its first frame has been uploaded.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstFrameReady {
    pub stream_id: u64,
}

/// Image target the preview panel displays. Frames are only accepted from the
/// stream currently attached.
#[derive(Resource, Debug, Default)]
pub struct RenderSurface {
    image: Handle<Image>,
    attached: Option<u64>,
    frames_presented: u64,
}

impl RenderSurface {
    pub fn new(images: &mut Assets<Image>) -> Self {
        Self {
            image: images.add(blank_image()),
            attached: None,
            frames_presented: 0,
        }
    }

    pub fn image(&self) -> &Handle<Image> {
        &self.image
    }

    pub fn attached(&self) -> Option<u64> {
        self.attached
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn attach(&mut self, stream_id: u64) {
        self.attached = Some(stream_id);
        self.frames_presented = 0;
    }

    pub fn detach(&mut self, images: &mut Assets<Image>) -> Option<u64> {
        self.frames_presented = 0;
        self.upload(blank_image(), images);
        self.attached.take()
    }

    /// Uploads `frame`. Returns true when it is the first frame of the attached stream.
    pub fn present(
        &mut self,
        stream_id: u64,
        frame: &VideoFrame,
        images: &mut Assets<Image>,
    ) -> bool {
        if self.attached != Some(stream_id) {
            return false;
        }
        let expected_len = (frame.width as usize) * (frame.height as usize) * 4;
        if frame.width == 0 || frame.height == 0 || frame.rgba.len() != expected_len {
            warn!(
                "Dropping malformed frame from stream {}: {}x{} with {} bytes",
                stream_id,
                frame.width,
                frame.height,
                frame.rgba.len()
            );
            return false;
        }

        self.upload(frame_image(frame), images);
        self.frames_presented += 1;
        self.frames_presented == 1
    }

    fn upload(&mut self, image: Image, images: &mut Assets<Image>) {
        if let Some(existing) = images.get_mut(&self.image) {
            *existing = image;
        } else {
            self.image = images.add(image);
        }
    }
}

fn blank_image() -> Image {
    Image::new_fill(
        Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &BLANK_PIXEL,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

fn frame_image(frame: &VideoFrame) -> Image {
    Image::new(
        Extent3d {
            width: frame.width,
            height: frame.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        frame.rgba.clone(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}
