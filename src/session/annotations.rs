//! Object annotations and naming: tags, memos, user defined fields, journal
//! records, 1LPF identifiers and display names.

use itertools::Itertools;
use serde::Serialize;

use super::Session;
use crate::codec;
use crate::data::Handle;
use crate::error::Result;
use crate::native::{Arg, Procedure};

/// Creation and last-modification record of an object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Journal {
    pub created_at: String,
    pub created_by: String,
    pub modified_at: String,
    pub modified_by: String,
}

impl Journal {
    /// Parses the engine's four-line record. Anything else yields an empty
    /// journal.
    pub fn parse(record: &str) -> Self {
        match record.lines().collect_tuple() {
            Some((created_at, created_by, modified_at, modified_by)) => Self {
                created_at: created_at.to_string(),
                created_by: created_by.to_string(),
                modified_at: modified_at.to_string(),
                modified_by: modified_by.to_string(),
            },
            None => Self::default(),
        }
    }
}

impl Session {
    pub fn tags(&self, handle: Handle) -> Result<Vec<String>> {
        let text = self.checked_text(Procedure::GetObjTags, &mut [Arg::Int(handle.raw())])?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split(',').map(str::to_string).collect())
    }

    /// Replaces every tag of the object.
    pub fn set_tags<I, S>(&self, handle: Handle, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tags.into_iter().map(|t| t.as_ref().to_owned()).join(",");
        let buf = codec::encode_str(&joined)?;
        self.status(Procedure::SetObjTags, &mut [Arg::Int(handle.raw()), Arg::In(&buf)])
    }

    /// Adds tags the object does not carry yet.
    pub fn append_tags<I, S>(&self, handle: Handle, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut all = self.tags(handle)?;
        all.extend(tags.into_iter().map(|t| t.as_ref().to_owned()));
        self.set_tags(handle, all.into_iter().unique())
    }

    /// Renames tag `old` to `new`. Returns whether `old` was present.
    pub fn replace_tag(&self, handle: Handle, old: &str, new: &str) -> Result<bool> {
        let tags = self.tags(handle)?;
        if !tags.iter().any(|t| t == old) {
            return Ok(false);
        }
        let renamed = tags.into_iter().map(|t| if t == old { new.to_string() } else { t });
        self.set_tags(handle, renamed.unique())?;
        Ok(true)
    }

    pub fn memo(&self, handle: Handle) -> Result<String> {
        self.checked_text(Procedure::GetObjMemo, &mut [Arg::Int(handle.raw())])
    }

    pub fn set_memo(&self, handle: Handle, memo: &str) -> Result<()> {
        let buf = codec::encode_str(memo)?;
        self.status(Procedure::SetObjMemo, &mut [Arg::Int(handle.raw()), Arg::In(&buf)])
    }

    /// Adds `text` as a new line of the memo.
    pub fn append_memo(&self, handle: Handle, text: &str) -> Result<()> {
        let memo = self.memo(handle)?;
        if memo.is_empty() {
            return self.set_memo(handle, text);
        }
        self.set_memo(handle, &format!("{memo}\n{text}"))
    }

    /// False as well when the memo cannot be read.
    pub fn memo_contains(&self, handle: Handle, text: &str) -> bool {
        self.memo(handle).is_ok_and(|memo| memo.contains(text))
    }

    /// Replaces every occurrence of `old` in the memo.
    pub fn replace_memo(&self, handle: Handle, old: &str, new: &str) -> Result<()> {
        let memo = self.memo(handle)?;
        self.set_memo(handle, &memo.replace(old, new))
    }

    pub fn guid(&self, handle: Handle) -> Result<String> {
        self.checked_text(Procedure::GetObjGUID, &mut [Arg::Int(handle.raw())])
    }

    pub fn journal(&self, handle: Handle) -> Result<Journal> {
        let record = self.checked_text(Procedure::GetObjJournalRecord, &mut [Arg::Int(handle.raw())])?;
        Ok(Journal::parse(&record))
    }

    /// Value of the user defined field `field`.
    pub fn udf(&self, handle: Handle, field: &str) -> Result<String> {
        let name = codec::encode_fixed(field, codec::UDF_NAME_LEN)?;
        let mut value = vec![0u8; codec::UDF_VALUE_LEN];
        self.status(
            Procedure::GetObjUDF,
            &mut [Arg::Int(handle.raw()), Arg::In(&name), Arg::Out(&mut value)],
        )?;
        Ok(codec::decode_str(&value))
    }

    /// Name and value of the `index`-th (0-based) user defined field.
    pub fn udf_by_index(&self, handle: Handle, index: i32) -> Result<(String, String)> {
        let mut name = vec![0u8; codec::UDF_NAME_LEN];
        let mut value = vec![0u8; codec::UDF_VALUE_LEN];
        self.status(
            Procedure::GetObjUDFByIndex,
            &mut [
                Arg::Int(handle.raw()),
                Arg::Int(index),
                Arg::Out(&mut name),
                Arg::Out(&mut value),
            ],
        )?;
        Ok((codec::decode_str(&name), codec::decode_str(&value)))
    }

    /// Sets an existing user defined field. Fields cannot be created here.
    pub fn set_udf(&self, handle: Handle, field: &str, value: &str) -> Result<()> {
        let name = codec::encode_fixed(field, codec::UDF_NAME_LEN)?;
        let value = codec::encode_fixed(value, codec::UDF_VALUE_LEN)?;
        self.status(
            Procedure::SetObjUDF,
            &mut [Arg::Int(handle.raw()), Arg::In(&name), Arg::In(&value)],
        )
    }

    /// Looks an object up by its 1LPF identifier, as printed by
    /// [`Session::print_1lpf`].
    pub fn find_1lpf(&self, id: &str) -> Result<Handle> {
        let buf = codec::encode_str(id)?;
        let mut hnd = [0u8; codec::INT_SIZE];
        self.status(Procedure::FindObj1LPF, &mut [Arg::In(&buf), Arg::Out(&mut hnd)])?;
        Ok(Handle(codec::decode_i32(&hnd)))
    }

    pub fn print_1lpf(&self, handle: Handle) -> Result<String> {
        self.checked_text(Procedure::PrintObj1LPF, &mut [Arg::Int(handle.raw())])
    }

    pub fn area_name(&self, number: i32) -> Result<String> {
        self.checked_text(Procedure::GetAreaName, &mut [Arg::Int(number)])
    }

    pub fn zone_name(&self, number: i32) -> Result<String> {
        self.checked_text(Procedure::GetZoneName, &mut [Arg::Int(number)])
    }

    /// Runs a OneLiner command given as XML.
    pub fn run_1lpf_command(&self, xml: &str) -> Result<()> {
        let buf = codec::encode_str(xml)?;
        self.status(Procedure::Run1LPFCommand, &mut [Arg::In(&buf)])
    }

    pub fn full_bus_name(&self, bus: Handle) -> Result<String> {
        self.checked_text(Procedure::FullBusName, &mut [Arg::Int(bus.raw())])
    }

    pub fn full_branch_name(&self, branch: Handle) -> Result<String> {
        self.checked_text(Procedure::FullBranchName, &mut [Arg::Int(branch.raw())])
    }

    pub fn full_relay_name(&self, relay: Handle) -> Result<String> {
        self.checked_text(Procedure::FullRelayName, &mut [Arg::Int(relay.raw())])
    }
}
