/*!

The errors of the crate. Operations that can fail on bad input return a `Result<_,Error>`,
with the `Error` tracking the place in the source where it was raised.
Conditions that indicate a bug, such as a planner/forwarder desynchronization, panic instead.

Errors are normally built with the `error!` macro, which captures the source location.

```ignore
return Err( error!(ill_formed_configuration,cv.clone()).with_message("something specific".to_string()) );
```

*/

use std::fmt::{self,Display,Formatter};

use crate::config::ConfigurationValue;

///A point of the crate source, captured by the `source_location!` macro.
#[derive(Debug,Clone)]
pub struct SourceLocation
{
	pub file: &'static str,
	pub line: u32,
}

impl Display for SourceLocation
{
	fn fmt(&self, f:&mut Formatter) -> fmt::Result
	{
		write!(f,"{}:{}",self.file,self.line)
	}
}

///The kinds of errors. Use the snake_case constructors of `Error` instead of building variants directly.
#[derive(Debug,Clone)]
pub enum ErrorKind
{
	///Some error not meriting a kind of its own.
	Undetermined,
	///An argument of an operation was outside its domain.
	BadArgument,
	///A mandatory configuration key was not given.
	MissingParameter(String),
	///A `ConfigurationValue` not following the syntax of the element being built.
	IllFormedConfiguration(ConfigurationValue),
	///The planner found no route between the two routers. The caller may drop the packet.
	UnroutablePacket{source:usize,destination:usize},
}

#[derive(Debug,Clone)]
pub struct Error
{
	pub source_location: SourceLocation,
	pub kind: ErrorKind,
	pub message: Option<String>,
}

impl Error
{
	pub fn undetermined(source_location:SourceLocation) -> Error
	{
		Error{ source_location, kind:ErrorKind::Undetermined, message:None }
	}
	pub fn bad_argument(source_location:SourceLocation) -> Error
	{
		Error{ source_location, kind:ErrorKind::BadArgument, message:None }
	}
	pub fn missing_parameter(source_location:SourceLocation, parameter:String) -> Error
	{
		Error{ source_location, kind:ErrorKind::MissingParameter(parameter), message:None }
	}
	pub fn ill_formed_configuration(source_location:SourceLocation, value:ConfigurationValue) -> Error
	{
		Error{ source_location, kind:ErrorKind::IllFormedConfiguration(value), message:None }
	}
	pub fn unroutable_packet(source_location:SourceLocation, source:usize, destination:usize) -> Error
	{
		Error{ source_location, kind:ErrorKind::UnroutablePacket{source,destination}, message:None }
	}
	///Attach a human-readable explanation to the error.
	pub fn with_message(mut self, message:String) -> Error
	{
		self.message = Some(message);
		self
	}
}

impl Display for Error
{
	fn fmt(&self, f:&mut Formatter) -> fmt::Result
	{
		write!(f,"{} raised at {}",
			match self.kind
			{
				ErrorKind::Undetermined => "undetermined error".to_string(),
				ErrorKind::BadArgument => "bad argument".to_string(),
				ErrorKind::MissingParameter(ref parameter) => format!("missing parameter {}",parameter),
				ErrorKind::IllFormedConfiguration(ref value) => format!("ill-formed configuration {:?}",value),
				ErrorKind::UnroutablePacket{source,destination} => format!("no route from router {} to router {}",source,destination),
			},
			self.source_location)?;
		if let Some(ref message)=self.message
		{
			write!(f,": {}",message)?;
		}
		Ok(())
	}
}

///Captures the location in the source code. To be stored in the raised errors.
#[macro_export]
macro_rules! source_location{
	() => {{
		$crate::error::SourceLocation{ file:file!(), line:line!() }
	}};
}

///Builds an `Error` of the given kind at the current source location.
///`error!(kind)` or `error!(kind,args...)`, with `kind` being one of the snake_case constructors of `Error`.
#[macro_export]
macro_rules! error{
	($kind:ident) => {{
		$crate::error::Error::$kind( $crate::source_location!() )
	}};
	($kind:ident, $($args:expr),* $(,)?) => {{
		$crate::error::Error::$kind( $crate::source_location!(), $($args),* )
	}};
}
