use crucible_core::HostFunction;
use extism::{CurrentPlugin, Error, UserData, Val};

use crate::host::util::{self, MAX_GUEST_STRING_LEN};
use crate::state::HostState;

/// Entries a guest may keep in its table.
const MAX_TABLE_ENTRIES: usize = 10_000;

/// `Core.Collections.Table`: a per-invocation string map.
pub(crate) fn call(
    host: HostFunction,
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
    user_data: &UserData<HostState>,
) -> Result<(), Error> {
    use HostFunction as H;

    let key = match host {
        H::TableSet | H::TableGet | H::TableHas | H::TableRemove => {
            util::arg_str(plugin, inputs, 0, MAX_GUEST_STRING_LEN)?
        },
        _ => String::new(),
    };
    let value = match host {
        H::TableSet => util::arg_str(plugin, inputs, 1, MAX_GUEST_STRING_LEN)?,
        _ => String::new(),
    };

    let shared = util::shared(user_data)?;
    let mut state = util::lock(&shared)?;
    match host {
        H::TableSet => {
            if state.table.len() >= MAX_TABLE_ENTRIES && !state.table.contains_key(&key) {
                return Err(Error::msg(format!(
                    "table is full ({MAX_TABLE_ENTRIES} entries)"
                )));
            }
            state.table.insert(key, value);
            Ok(())
        },
        H::TableGet => {
            let found = state.table.get(&key).cloned().unwrap_or_default();
            drop(state);
            util::ret_str(plugin, outputs, &found)
        },
        H::TableHas => util::ret_bool(outputs, state.table.contains_key(&key)),
        H::TableRemove => util::ret_bool(outputs, state.table.remove(&key).is_some()),
        H::TableCount => {
            let count = i32::try_from(state.table.len()).unwrap_or(i32::MAX);
            util::ret_i32(outputs, count)
        },
        H::TableClear => {
            state.table.clear();
            Ok(())
        },
        other => Err(Error::msg(format!("{other} is not a table function"))),
    }
}
