//! Active usecase records and the device-wide list that holds them.

use serde::{Deserialize, Serialize};

use super::types::{AudioDeviceType, SndDevice, UsecaseId, UsecaseType};
use crate::error::VoiceError;

/// One active routing instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usecase {
    pub id: UsecaseId,
    pub kind: UsecaseType,
    /// Framework devices copied from the call output at creation time.
    pub devices: Vec<AudioDeviceType>,
    pub in_snd_device: SndDevice,
    pub out_snd_device: SndDevice,
}

impl Usecase {
    pub fn new(id: UsecaseId, kind: UsecaseType, devices: Vec<AudioDeviceType>) -> Self {
        Self {
            id,
            kind,
            devices,
            in_snd_device: SndDevice::None,
            out_snd_device: SndDevice::None,
        }
    }

    pub fn has_sco_device(&self) -> bool {
        self.devices.iter().any(|d| d.is_sco())
    }
}

/// Usecases currently linked into the device, in activation order.
#[derive(Debug, Default, Clone)]
pub struct UsecaseList {
    entries: Vec<Usecase>,
}

impl UsecaseList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a usecase, reporting allocation failure instead of aborting.
    pub fn try_push(&mut self, usecase: Usecase) -> Result<(), VoiceError> {
        self.entries
            .try_reserve(1)
            .map_err(|_| VoiceError::AllocationFailed {
                what: "audio usecase",
            })?;
        self.entries.push(usecase);
        Ok(())
    }

    pub fn get(&self, id: UsecaseId) -> Option<&Usecase> {
        self.entries.iter().find(|uc| uc.id == id)
    }

    pub fn get_mut(&mut self, id: UsecaseId) -> Option<&mut Usecase> {
        self.entries.iter_mut().find(|uc| uc.id == id)
    }

    pub fn contains(&self, id: UsecaseId) -> bool {
        self.get(id).is_some()
    }

    /// Unlink a usecase and hand ownership back to the caller.
    pub fn remove(&mut self, id: UsecaseId) -> Option<Usecase> {
        let pos = self.entries.iter().position(|uc| uc.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Usecase> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, kind: UsecaseType) -> usize {
        self.entries.iter().filter(|uc| uc.kind == kind).count()
    }

    /// Ids of every voice usecase, snapshotted so callers can mutate the list.
    pub fn voice_call_ids(&self) -> Vec<UsecaseId> {
        self.entries
            .iter()
            .filter(|uc| uc.kind == UsecaseType::VoiceCall)
            .map(|uc| uc.id)
            .collect()
    }
}
