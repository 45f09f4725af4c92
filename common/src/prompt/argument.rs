use std::collections::HashMap;

use crate::crypto::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArgError {
    #[error("Invalid value for this argument type")]
    InvalidType,
    #[error("Argument '{}' not found", _0)]
    NotFound(String),
}

pub enum ArgValue {
    Bool(bool),
    Number(u64),
    String(String),
    Address(Address),
}

impl ArgValue {
    pub fn to_bool(self) -> Result<bool, ArgError> {
        match self {
            ArgValue::Bool(b) => Ok(b),
            _ => Err(ArgError::InvalidType),
        }
    }

    pub fn to_number(self) -> Result<u64, ArgError> {
        match self {
            ArgValue::Number(n) => Ok(n),
            _ => Err(ArgError::InvalidType),
        }
    }

    pub fn to_string_value(self) -> Result<String, ArgError> {
        match self {
            ArgValue::String(s) => Ok(s),
            _ => Err(ArgError::InvalidType),
        }
    }

    pub fn to_address(self) -> Result<Address, ArgError> {
        match self {
            ArgValue::Address(address) => Ok(address),
            _ => Err(ArgError::InvalidType),
        }
    }
}

pub enum ArgType {
    Bool,
    Number,
    String,
    Address,
}

impl ArgType {
    pub fn to_value(&self, value: &str) -> Result<ArgValue, ArgError> {
        Ok(match self {
            ArgType::Bool => {
                let value = value.to_lowercase();
                if ["true", "yes", "y", "1"].contains(&value.as_str()) {
                    ArgValue::Bool(true)
                } else if ["false", "no", "n", "0"].contains(&value.as_str()) {
                    ArgValue::Bool(false)
                } else {
                    return Err(ArgError::InvalidType);
                }
            }
            ArgType::Number => ArgValue::Number(value.parse().map_err(|_| ArgError::InvalidType)?),
            ArgType::String => ArgValue::String(value.to_owned()),
            ArgType::Address => {
                ArgValue::Address(Address::from_string(value).map_err(|_| ArgError::InvalidType)?)
            }
        })
    }
}

pub struct Arg {
    name: String,
    arg_type: ArgType,
}

impl Arg {
    pub fn new(name: &str, arg_type: ArgType) -> Self {
        Self {
            name: name.to_owned(),
            arg_type,
        }
    }

    pub fn get_name(&self) -> &String {
        &self.name
    }

    pub fn get_type(&self) -> &ArgType {
        &self.arg_type
    }
}

pub struct ArgumentManager {
    arguments: HashMap<String, ArgValue>,
}

impl ArgumentManager {
    pub fn new(arguments: HashMap<String, ArgValue>) -> Self {
        Self { arguments }
    }

    pub fn get_value(&mut self, name: &str) -> Result<ArgValue, ArgError> {
        self.arguments
            .remove(name)
            .ok_or_else(|| ArgError::NotFound(name.to_owned()))
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    // Get flag value
    // If its not present, return false
    pub fn get_flag(&mut self, name: &str) -> Result<bool, ArgError> {
        self.arguments
            .remove(name)
            .map(|value| value.to_bool())
            .unwrap_or(Ok(false))
    }

    pub fn size(&self) -> usize {
        self.arguments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_argument_parsing() {
        let value = ArgType::Address
            .to_value("0xac27fa800955849d6d17cc8952ba9dd6eaa66187")
            .unwrap();
        assert!(matches!(value, ArgValue::Address(_)));

        assert!(ArgType::Address.to_value("not-an-address").is_err());
    }

    #[test]
    fn test_bool_argument_parsing() {
        assert!(ArgType::Bool.to_value("yes").unwrap().to_bool().unwrap());
        assert!(!ArgType::Bool.to_value("n").unwrap().to_bool().unwrap());
        assert!(ArgType::Bool.to_value("maybe").is_err());
    }

    #[test]
    fn test_argument_manager() {
        let mut arguments = HashMap::new();
        arguments.insert("page".to_owned(), ArgValue::Number(3));
        let mut manager = ArgumentManager::new(arguments);

        assert!(manager.has_argument("page"));
        assert_eq!(manager.get_value("page").unwrap().to_number().unwrap(), 3);
        assert!(!manager.has_argument("page"));
        assert!(manager.get_value("page").is_err());
    }
}
