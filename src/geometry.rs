use crate::hardware::{CameraInfo, Facing, Size};

/// Discrete rotation of the display from its natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 90,
            Rotation::Rotation180 => 180,
            Rotation::Rotation270 => 270,
        }
    }

    /// Next rotation clockwise
    pub fn next(&self) -> Self {
        match self {
            Rotation::Rotation0 => Rotation::Rotation90,
            Rotation::Rotation90 => Rotation::Rotation180,
            Rotation::Rotation180 => Rotation::Rotation270,
            Rotation::Rotation270 => Rotation::Rotation0,
        }
    }
}

/// Placement of the preview surface relative to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewLayout {
    pub size: Size,
    /// Offsets that center the surface; negative when it overhangs
    pub offset_x: i32,
    pub offset_y: i32,
}

/// Picks the preview size whose aspect ratio is closest to the display's.
///
/// On equal difference the later candidate wins. Returns `None` only for an
/// empty list.
pub fn best_preview_size(sizes: &[Size], display_aspect: f32) -> Option<Size> {
    let mut best = None;
    let mut min_diff = f32::INFINITY;

    for size in sizes {
        let diff = (display_aspect - size.aspect_ratio()).abs();
        if diff <= min_diff {
            min_diff = diff;
            best = Some(*size);
        }
    }

    best
}

/// Scales `preview` by whole multiples so it covers `display` on both axes,
/// then centers it. The result is always larger than the display (crop-to-fill).
pub fn scaled_preview_size(preview: Size, display: Size) -> PreviewLayout {
    let preview_width = preview.width.max(1);
    let preview_height = preview.height.max(1);

    let width = preview_width * (display.width / preview_width + 1);
    let height = preview_height * (display.height / preview_height + 1);

    PreviewLayout {
        size: Size::new(width, height),
        offset_x: (display.width as i32 - width as i32) / 2,
        offset_y: (display.height as i32 - height as i32) / 2,
    }
}

/// Rotation to apply to preview frames so they appear upright on the display
pub fn display_angle(info: &CameraInfo, rotation: Rotation) -> u32 {
    let degrees = rotation.degrees();
    let orientation = info.orientation % 360;

    match info.facing {
        // Front sensors are mirrored
        Facing::Front => (360 - (orientation + degrees) % 360) % 360,
        Facing::Back => (orientation + 360 - degrees) % 360,
    }
}

/// Clockwise rotation to apply to a captured picture
pub fn capture_rotation(info: &CameraInfo, rotation: Rotation) -> u32 {
    let angle = display_angle(info, rotation);
    match info.facing {
        Facing::Front => (360 - angle) % 360,
        Facing::Back => angle,
    }
}

/// Orders picture sizes by descending width. Equal widths keep the device's order.
pub fn sort_picture_sizes(sizes: &mut [Size]) {
    sizes.sort_by(|lhs, rhs| rhs.width.cmp(&lhs.width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn back(orientation: u32) -> CameraInfo {
        CameraInfo {
            facing: Facing::Back,
            orientation,
        }
    }

    fn front(orientation: u32) -> CameraInfo {
        CameraInfo {
            facing: Facing::Front,
            orientation,
        }
    }

    #[test]
    fn test_best_preview_size_picks_closest_ratio() {
        let sizes = [
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(352, 288),
        ];
        assert_eq!(
            best_preview_size(&sizes, 1920.0 / 1080.0),
            Some(Size::new(1280, 720))
        );
        assert_eq!(
            best_preview_size(&sizes, 4.0 / 3.0),
            Some(Size::new(640, 480))
        );
    }

    #[test]
    fn test_best_preview_size_last_equal_wins() {
        let sizes = [Size::new(1280, 720), Size::new(1920, 1080), Size::new(640, 480)];
        assert_eq!(
            best_preview_size(&sizes, 16.0 / 9.0),
            Some(Size::new(1920, 1080))
        );
    }

    #[test]
    fn test_best_preview_size_not_biased_to_first() {
        // Every candidate differs from the display by more than the first
        // candidate's own ratio; the closest one must still win.
        let sizes = [Size::new(480, 640), Size::new(1280, 720)];
        assert_eq!(best_preview_size(&sizes, 5.0), Some(Size::new(1280, 720)));
    }

    #[test]
    fn test_best_preview_size_empty() {
        assert_eq!(best_preview_size(&[], 1.5), None);
    }

    #[test]
    fn test_scaled_preview_covers_display() {
        let layout = scaled_preview_size(Size::new(640, 480), Size::new(1080, 1920));
        assert_eq!(layout.size, Size::new(1280, 2400));
        assert_eq!(layout.offset_x, -100);
        assert_eq!(layout.offset_y, -240);
    }

    #[test]
    fn test_scaled_preview_overscales_exact_multiple() {
        let layout = scaled_preview_size(Size::new(640, 480), Size::new(1280, 960));
        assert_eq!(layout.size, Size::new(1920, 1440));
    }

    #[test]
    fn test_display_angle_back_camera() {
        assert_eq!(display_angle(&back(90), Rotation::Rotation90), 0);
        assert_eq!(display_angle(&back(90), Rotation::Rotation0), 90);
        assert_eq!(display_angle(&back(90), Rotation::Rotation270), 180);
        assert_eq!(display_angle(&back(0), Rotation::Rotation180), 180);
    }

    #[test]
    fn test_display_angle_front_camera() {
        assert_eq!(display_angle(&front(270), Rotation::Rotation0), 90);
        assert_eq!(display_angle(&front(270), Rotation::Rotation90), 0);
        assert_eq!(display_angle(&front(270), Rotation::Rotation180), 270);
    }

    #[test]
    fn test_capture_rotation_mirrors_front() {
        assert_eq!(capture_rotation(&front(270), Rotation::Rotation0), 270);
        assert_eq!(capture_rotation(&back(90), Rotation::Rotation0), 90);
        assert_eq!(capture_rotation(&front(270), Rotation::Rotation90), 0);
    }

    #[test]
    fn test_sort_picture_sizes_is_stable() {
        let mut sizes = vec![
            Size::new(640, 480),
            Size::new(2048, 1536),
            Size::new(640, 360),
            Size::new(1280, 720),
        ];
        sort_picture_sizes(&mut sizes);
        assert_eq!(
            sizes,
            vec![
                Size::new(2048, 1536),
                Size::new(1280, 720),
                Size::new(640, 480),
                Size::new(640, 360),
            ]
        );
    }

    #[test]
    fn test_rotation_cycle() {
        let mut rotation = Rotation::default();
        for expected in [90, 180, 270, 0] {
            rotation = rotation.next();
            assert_eq!(rotation.degrees(), expected);
        }
    }

    fn size_strategy() -> impl Strategy<Value = Size> {
        (1u32..5000, 1u32..5000).prop_map(|(w, h)| Size::new(w, h))
    }

    proptest! {
        #[test]
        fn best_preview_size_is_a_closest_candidate(
            sizes in prop::collection::vec(size_strategy(), 1..12),
            aspect in 0.2f32..5.0,
        ) {
            let best = best_preview_size(&sizes, aspect).unwrap();
            prop_assert!(sizes.contains(&best));
            let best_diff = (aspect - best.aspect_ratio()).abs();
            for size in &sizes {
                prop_assert!((aspect - size.aspect_ratio()).abs() >= best_diff);
            }
        }

        #[test]
        fn scaled_preview_never_underfills(
            preview in size_strategy(),
            display in size_strategy(),
        ) {
            let layout = scaled_preview_size(preview, display);
            prop_assert!(layout.size.width >= display.width);
            prop_assert!(layout.size.height >= display.height);
            prop_assert!(layout.offset_x <= 0);
            prop_assert!(layout.offset_y <= 0);
        }

        #[test]
        fn sorted_widths_are_non_increasing(
            mut sizes in prop::collection::vec(size_strategy(), 0..20),
        ) {
            sort_picture_sizes(&mut sizes);
            for pair in sizes.windows(2) {
                prop_assert!(pair[0].width >= pair[1].width);
            }
        }

        #[test]
        fn display_angle_is_right_angle(
            orientation in prop::sample::select(vec![0u32, 90, 180, 270]),
            front_facing in any::<bool>(),
            steps in 0usize..4,
        ) {
            let info = if front_facing { front(orientation) } else { back(orientation) };
            let mut rotation = Rotation::Rotation0;
            for _ in 0..steps {
                rotation = rotation.next();
            }
            let angle = display_angle(&info, rotation);
            prop_assert!(angle < 360);
            prop_assert_eq!(angle % 90, 0);
        }
    }
}
