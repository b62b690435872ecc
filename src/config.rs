/*!

The typed configuration tree from which the components of the crate are built.

Parsing text into a `ConfigurationValue` is the job of the embedding simulator; this
crate receives the already-built values, in the same shape a configuration file would
produce. The builders of each component destructure their value with the
`match_object!`/`match_object_panic!` macros.

```ignore
PolarFlyPlus{
	k: 2,//hypercube ports per router
	n: 3,//PolarFly ports per router, selects the 7x3 table
	link_failures: 0,
	fail_seed: 42,
}
```

*/

use std::fmt::{self,Display,Formatter};

use rand::{rngs::StdRng,SeedableRng};

use crate::error::Error;
use crate::error;
use crate::quantify::Quantifiable;

///A value of the configuration tree.
///* An `Object` is typed `Name { key1 : value1, key2 : value2, [...] }`.
///* An `Array` is typed `[value1, value2, value3, [...]]`.
///* A `Number` is stored as a `f64`.
///* A `Literal` is a double-quoted string.
#[derive(Clone,Debug,PartialEq)]
pub enum ConfigurationValue
{
	Literal(String),
	Number(f64),
	Object(String,Vec<(String,ConfigurationValue)>),
	Array(Vec<ConfigurationValue>),
	True,
	False,
}

impl Quantifiable for ConfigurationValue
{
	fn total_memory(&self) -> usize
	{
		use ConfigurationValue::*;
		std::mem::size_of::<ConfigurationValue>() + match self
		{
			Literal(ref s) => s.capacity(),
			Object(ref name, ref pairs) => name.capacity() + pairs.iter().map(|(key,value)|key.capacity()+value.total_memory()).sum::<usize>(),
			Array(ref list) => list.iter().map(|value|value.total_memory()).sum::<usize>(),
			_ => 0,
		}
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl Display for ConfigurationValue
{
	fn fmt(&self, f:&mut Formatter) -> fmt::Result
	{
		use ConfigurationValue::*;
		match self
		{
			Literal(ref s) => write!(f,"\"{}\"",s),
			Number(x) => write!(f,"{}",x),
			Object(ref name, ref pairs) =>
			{
				write!(f,"{}{{",name)?;
				for (index,(key,value)) in pairs.iter().enumerate()
				{
					if index>0 { write!(f,", ")?; }
					write!(f,"{}: {}",key,value)?;
				}
				write!(f,"}}")
			},
			Array(ref list) =>
			{
				write!(f,"[")?;
				for (index,value) in list.iter().enumerate()
				{
					if index>0 { write!(f,", ")?; }
					write!(f,"{}",value)?;
				}
				write!(f,"]")
			},
			True => write!(f,"true"),
			False => write!(f,"false"),
		}
	}
}

/// match arms against the keys of an object
/// first argument, `$cv:expr`, is the ConfigurationValue expected to be the object
/// second argument, `$name:literal`, is the name the Object should have.
/// third argument, `$valueid:ident`, is the variable name capturing the value in the object's elements
///    and can be used in the arms
/// the remaining arguments are the arms of the match.
#[macro_export]
macro_rules! match_object{
	($cv:expr, $name:literal, $valueid:ident, $($arm:tt)* ) => {{
		match_object!($cv,[$name],$valueid,$($arm)*)
	}};
	($cv:expr, $names:expr, $valueid:ident, $($arm:tt)* ) => {{
		if let &$crate::config::ConfigurationValue::Object(ref cv_name, ref cv_pairs) = $cv
		{
			if !$names.iter().any(|&x|x==cv_name)
			{
				if $names.len()==1 {
					panic!("A {} must be created from a `{}` object not `{}`",$names[0],$names[0],cv_name);
				} else {
					panic!("Trying to create either of `{:?}` object from `{}`",$names,cv_name);
				}
			}
			for &(ref name,ref $valueid) in cv_pairs
			{
				match AsRef::<str>::as_ref(&name)
				{
					$( $arm )*
					"legend_name" => (),
					_ => return Err($crate::error!(ill_formed_configuration,$cv.clone()).with_message(format!("Nothing to do with field {} in {}",name,$names.get(0).unwrap_or_else(||&"None")))),
				}
			}
		}
		else
		{
			return Err($crate::error!(ill_formed_configuration,$cv.clone()).with_message(format!("Trying to create a {} from a non-Object",$names.get(0).unwrap_or_else(||&"None"))));
		}
	}};
}

///Like `match_object!` but panicking on errors.
#[macro_export]
macro_rules! match_object_panic{
	($cv:expr, $name:literal, $valueid:ident ) => {{
		match_object_panic!($cv,[$name],$valueid,)
	}};
	($cv:expr, $name:literal, $valueid:ident, $($arm:tt)* ) => {{
		match_object_panic!($cv,[$name],$valueid,$($arm)*)
	}};
	($cv:expr, $names:expr, $valueid:ident, $($arm:tt)* ) => {{
		if let &$crate::config::ConfigurationValue::Object(ref cv_name, ref cv_pairs) = $cv
		{
			if !$names.iter().any(|&x|x==cv_name)
			{
				if $names.len()==1 {
					panic!("A {} must be created from a `{}` object not `{}`",$names[0],$names[0],cv_name);
				} else {
					panic!("Trying to create either of `{:?}` object from `{}`",$names,cv_name);
				}
			}
			for &(ref name,ref $valueid) in cv_pairs
			{
				match AsRef::<str>::as_ref(&name)
				{
					$( $arm )*
					"legend_name" => (),
					_ => panic!("Nothing to do with field {} in {}",name,$names[0]),
				}
			}
		}
		else
		{
			panic!("Trying to create a {} from a non-Object",$names[0]);
		}
	}};
}

impl ConfigurationValue
{
	pub fn as_bool(&self) -> Result<bool,Error>
	{
		match self
		{
			&ConfigurationValue::True => Ok(true),
			&ConfigurationValue::False => Ok(false),
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_str(&self) -> Result<&str,Error>
	{
		match self
		{
			&ConfigurationValue::Literal(ref s) => Ok(s),
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_f64(&self) -> Result<f64,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) => Ok(x),
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_usize(&self) -> Result<usize,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) =>{
				let res =  x as usize;
				// Casting from a float to an integer will round the float towards zero
				// overflows and underflows will saturate
				// Casting from an integer to float will produce the closest possible float
				let y = res as f64;
				let tolerance = 1e-5;
				if x-y > tolerance || x-y < -tolerance {
					Err(error!(ill_formed_configuration, self.clone()))
				} else {
					Ok( res )
				}
			},
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_i32(&self) -> Result<i32,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) =>{
				let res =  x as i32;
				let y = res as f64;
				let tolerance = 1e-5;
				if x-y > tolerance || x-y < -tolerance {
					Err(error!(ill_formed_configuration, self.clone()))
				} else {
					Ok( res )
				}
			},
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_u64(&self) -> Result<u64,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) =>{
				let res =  x as u64;
				let y = res as f64;
				let tolerance = 1e-5;
				if x-y > tolerance || x-y < -tolerance {
					Err(error!(ill_formed_configuration, self.clone()))
				} else {
					Ok( res )
				}
			},
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_array(&self) -> Result<&Vec<ConfigurationValue>,Error>
	{
		match self
		{
			&ConfigurationValue::Array(ref x) => Ok(x),
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	pub fn as_rng(&self) -> Result<StdRng,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) =>{
				let seed =  x as u64;
				let y = seed as f64;
				let tolerance = 1e-5;
				if x-y > tolerance || x-y < -tolerance {
					Err(error!(ill_formed_configuration, self.clone()))
				} else {
					Ok( StdRng::seed_from_u64(seed) )
				}
			},
			_ => Err(error!(ill_formed_configuration, self.clone() )),
		}
	}
	/// Build a generic IllFormedConfiguration error from this ConfigurationValue.
	pub fn ill(&self,message:&str) -> Error
	{
		error!(ill_formed_configuration,self.clone()).with_message(message.to_string())
	}
}
