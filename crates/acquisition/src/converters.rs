//! Memory converters
//!
//! Read memory keys and build transport messages for the scheduler.

use std::sync::Arc;

use contracts::{now_secs, ContractError, DataType, MemoryProxy, Payload, StampedMessage, Value};
use scheduler::Converter;
use tracing::{debug, warn};

/// Resolve the scalar type of `key`
///
/// Reads the key once. An explicit `hint` wins; `DataType::None` infers the
/// type from the value read.
///
/// # Errors
/// `KeyUnreachable` if the read fails, `UnrecognizedType` if no scalar type
/// matches the value.
pub fn probe_type(
    memory: &dyn MemoryProxy,
    key: &str,
    hint: DataType,
) -> Result<DataType, ContractError> {
    let value = memory.get_data(key)?;
    if hint != DataType::None {
        return Ok(hint);
    }
    DataType::infer(&value).ok_or_else(|| ContractError::unrecognized_type(key, value.kind()))
}

/// Build the scalar payload of `value` as `data_type`
pub fn scalar_payload(key: &str, value: &Value, data_type: DataType) -> Result<Payload, ContractError> {
    let mismatch = || ContractError::type_mismatch(key, data_type.to_string(), value.kind());
    match data_type {
        DataType::Float => value.as_f64().map(|data| Payload::Float { data }).ok_or_else(mismatch),
        DataType::Int => value.as_i64().map(|data| Payload::Int { data }).ok_or_else(mismatch),
        DataType::Bool => value.as_bool().map(|data| Payload::Bool { data }).ok_or_else(mismatch),
        DataType::String => match value {
            Value::Str(s) => Ok(Payload::Text { data: s.clone() }),
            _ => Err(mismatch()),
        },
        DataType::None => {
            let inferred = DataType::infer(value)
                .ok_or_else(|| ContractError::unrecognized_type(key, value.kind()))?;
            scalar_payload(key, value, inferred)
        }
    }
}

/// Polled single-key converter
pub struct MemoryConverter {
    name: String,
    key: String,
    frequency: f64,
    data_type: DataType,
    memory: Arc<dyn MemoryProxy>,
}

impl MemoryConverter {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        frequency: f64,
        data_type: DataType,
        memory: Arc<dyn MemoryProxy>,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            frequency,
            data_type,
            memory,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl Converter for MemoryConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn convert(&mut self) -> Result<StampedMessage, ContractError> {
        let value = self.memory.get_data(&self.key)?;
        let payload = scalar_payload(&self.key, &value, self.data_type)?;
        Ok(StampedMessage::new(&self.name, now_secs(), payload))
    }
}

/// Polled converter reading many keys into one memory-list message
pub struct MemoryListConverter {
    name: String,
    keys: Vec<String>,
    frequency: f64,
    memory: Arc<dyn MemoryProxy>,
}

impl MemoryListConverter {
    pub fn new(
        name: impl Into<String>,
        keys: Vec<String>,
        frequency: f64,
        memory: Arc<dyn MemoryProxy>,
    ) -> Self {
        Self {
            name: name.into(),
            keys,
            frequency,
            memory,
        }
    }
}

impl Converter for MemoryListConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn convert(&mut self) -> Result<StampedMessage, ContractError> {
        let values = self.memory.get_list_data(&self.keys)?;
        let entries = self.keys.iter().cloned().zip(values).collect();
        Ok(StampedMessage::new(
            &self.name,
            now_secs(),
            Payload::MemoryList { entries },
        ))
    }
}

/// One-shot robot info converter
///
/// Unreadable keys are reported as `Value::Null` so the info message is
/// always produced.
pub struct InfoConverter {
    name: String,
    keys: Vec<String>,
    memory: Arc<dyn MemoryProxy>,
}

impl InfoConverter {
    pub fn new(name: impl Into<String>, keys: Vec<String>, memory: Arc<dyn MemoryProxy>) -> Self {
        Self {
            name: name.into(),
            keys,
            memory,
        }
    }
}

impl Converter for InfoConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn frequency(&self) -> f64 {
        0.0
    }

    fn convert(&mut self) -> Result<StampedMessage, ContractError> {
        let entries = self
            .keys
            .iter()
            .map(|key| {
                let value = self.memory.get_data(key).unwrap_or_else(|e| {
                    warn!(key = %key, error = %e, "robot info key unreadable");
                    Value::Null
                });
                (key.clone(), value)
            })
            .collect::<Vec<_>>();
        debug!(keys = entries.len(), "robot info read");
        Ok(StampedMessage::new(
            &self.name,
            now_secs(),
            Payload::MemoryList { entries },
        ))
    }
}
