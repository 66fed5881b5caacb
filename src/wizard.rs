//! Pipeline state, its transitions, and the stage gating consumed by navigation UIs.

use crate::{
    assets::source::SourceImage,
    crop::session::CroppedImage,
    foundation::error::{PipelineError, PipelineResult},
    model::{FrameAsset, University},
    render::compositor::CompositeResult,
};

/// Inputs and outputs of one profile-photo session.
///
/// Every mutation goes through a transition method so the invariants hold:
/// a composite only exists while a crop and a frame do, and any change to the
/// source, crop or frame clears it.
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    source_image: Option<SourceImage>,
    committed_crop: Option<CroppedImage>,
    selected_university: Option<University>,
    selected_frame: Option<FrameAsset>,
    composite: Option<CompositeResult>,
    composite_seq: u64,
}

/// Snapshot of the inputs of one compositing attempt.
#[derive(Clone, Debug)]
pub struct CompositeTicket {
    pub seq: u64,
    pub cropped: CroppedImage,
    pub frame: FrameAsset,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source_image.as_ref()
    }

    pub fn committed_crop(&self) -> Option<&CroppedImage> {
        self.committed_crop.as_ref()
    }

    pub fn selected_university(&self) -> Option<&University> {
        self.selected_university.as_ref()
    }

    pub fn selected_frame(&self) -> Option<&FrameAsset> {
        self.selected_frame.as_ref()
    }

    pub fn composite(&self) -> Option<&CompositeResult> {
        self.composite.as_ref()
    }

    /// New upload: the previous crop and composite no longer apply.
    pub fn upload(&mut self, source: SourceImage) {
        self.source_image = Some(source);
        self.committed_crop = None;
        self.invalidate_composite();
    }

    pub fn commit_crop(&mut self, cropped: CroppedImage) -> PipelineResult<()> {
        if self.source_image.is_none() {
            return Err(PipelineError::precondition(
                "cannot commit a crop before a photo is uploaded",
            ));
        }
        self.committed_crop = Some(cropped);
        self.invalidate_composite();
        Ok(())
    }

    /// Frames belong to a university, so changing it drops the selected frame.
    pub fn select_university(&mut self, university: University) {
        self.selected_university = Some(university);
        self.selected_frame = None;
        self.invalidate_composite();
    }

    pub fn select_frame(&mut self, frame: FrameAsset) {
        self.selected_frame = Some(frame);
        self.invalidate_composite();
    }

    /// Issue a ticket for a new compositing attempt. Any attempt issued earlier
    /// becomes stale.
    pub fn begin_composite(&mut self) -> PipelineResult<CompositeTicket> {
        let (Some(cropped), Some(frame)) = (&self.committed_crop, &self.selected_frame) else {
            return Err(PipelineError::precondition(
                "compositing requires a committed crop and a selected frame",
            ));
        };
        let ticket = CompositeTicket {
            seq: self.composite_seq + 1,
            cropped: cropped.clone(),
            frame: frame.clone(),
        };
        self.composite_seq = ticket.seq;
        Ok(ticket)
    }

    /// Store `result` if `seq` is the latest ticket; otherwise discard it.
    pub fn complete_composite(&mut self, seq: u64, result: CompositeResult) -> bool {
        if seq != self.composite_seq {
            tracing::debug!(
                seq,
                latest = self.composite_seq,
                "discarding stale composite"
            );
            return false;
        }
        self.composite = Some(result);
        true
    }

    fn invalidate_composite(&mut self) {
        self.composite = None;
        self.composite_seq += 1;
    }

    pub fn upload_complete(&self) -> bool {
        self.source_image.is_some()
    }

    pub fn crop_complete(&self) -> bool {
        self.committed_crop.is_some()
    }

    pub fn university_selected(&self) -> bool {
        self.selected_university.is_some()
    }

    pub fn frame_selected(&self) -> bool {
        self.selected_frame.is_some()
    }

    pub fn preview_ready(&self) -> bool {
        self.composite.is_some()
    }

    pub fn stage_complete(&self, stage: Stage) -> bool {
        match stage {
            Stage::Upload => self.upload_complete(),
            Stage::Crop => self.crop_complete(),
            Stage::SelectUniversity => self.university_selected(),
            Stage::SelectFrame => self.frame_selected(),
            Stage::Preview => self.preview_ready(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Upload,
    Crop,
    SelectUniversity,
    SelectFrame,
    Preview,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Upload,
        Stage::Crop,
        Stage::SelectUniversity,
        Stage::SelectFrame,
        Stage::Preview,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Upload => "Upload Photo",
            Stage::Crop => "Crop Photo",
            Stage::SelectUniversity => "Select University",
            Stage::SelectFrame => "Choose Frame",
            Stage::Preview => "Preview & Download",
        }
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

/// Step-by-step navigation over [`Stage`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wizard {
    current: Stage,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Forward progress needs the current stage to be complete and a stage after it.
    pub fn can_proceed(&self, state: &PipelineState) -> bool {
        state.stage_complete(self.current) && self.current.next().is_some()
    }

    pub fn next(&mut self, state: &PipelineState) -> bool {
        if !self.can_proceed(state) {
            return false;
        }
        match self.current.next() {
            Some(stage) => {
                self.current = stage;
                true
            }
            None => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        match self.current.previous() {
            Some(stage) => {
                self.current = stage;
                true
            }
            None => false,
        }
    }

    /// Jump back to `stage`. Moving forward this way is refused.
    pub fn go_to(&mut self, stage: Stage) -> bool {
        if stage > self.current {
            return false;
        }
        self.current = stage;
        true
    }

    pub fn progress_label(&self) -> String {
        format!(
            "Step {} of {}",
            self.current.index() + 1,
            Stage::ALL.len()
        )
    }
}
