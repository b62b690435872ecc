/*!

Helpers for tracking the memory employed by the simulator components.

The components of this crate implement the `Quantifiable` trait, mostly through
`#[derive(Quantifiable)]` from the `quantifiable-derive` crate.

*/

use std::mem::size_of;

///To determine the memory being employed by the simulator components.
pub trait Quantifiable
{
	///Get the total memory currently being employed by the implementing type. Both stack and heap.
	fn total_memory(&self) -> usize;
	///Prints by stdout how much memory is used per component.
	fn print_memory_breakdown(&self);
	///Get an estimation on how much memory the type could reach during the simulation.
	fn forecast_total_memory(&self) -> usize;
}

macro_rules! quantify_plain{
	($($t:ty),*) => {
		$(
		impl Quantifiable for $t
		{
			fn total_memory(&self) -> usize
			{
				size_of::<$t>()
			}
			fn print_memory_breakdown(&self)
			{
				println!("{}: {} bytes",stringify!($t),size_of::<$t>());
			}
			fn forecast_total_memory(&self) -> usize
			{
				size_of::<$t>()
			}
		}
		)*
	};
}

quantify_plain!(bool,u8,u16,u32,u64,usize,i8,i16,i32,i64,isize,f32,f64,());

impl<T:Quantifiable> Quantifiable for Vec<T>
{
	fn total_memory(&self) -> usize
	{
		size_of::<Vec<T>>() + self.iter().map(|element|element.total_memory()).sum::<usize>() + (self.capacity()-self.len())*size_of::<T>()
	}
	fn print_memory_breakdown(&self)
	{
		println!("vector of {} elements: {} bytes",self.len(),self.total_memory());
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T:Quantifiable+?Sized> Quantifiable for Box<T>
{
	fn total_memory(&self) -> usize
	{
		size_of::<Box<T>>() + self.as_ref().total_memory()
	}
	fn print_memory_breakdown(&self)
	{
		self.as_ref().print_memory_breakdown();
	}
	fn forecast_total_memory(&self) -> usize
	{
		size_of::<Box<T>>() + self.as_ref().forecast_total_memory()
	}
}

impl<T:Quantifiable> Quantifiable for Option<T>
{
	fn total_memory(&self) -> usize
	{
		size_of::<Option<T>>() + match self
		{
			Some(ref value) => value.total_memory(),
			None => 0,
		}
	}
	fn print_memory_breakdown(&self)
	{
		println!("optional value: {} bytes",self.total_memory());
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl Quantifiable for String
{
	fn total_memory(&self) -> usize
	{
		size_of::<String>() + self.capacity()
	}
	fn print_memory_breakdown(&self)
	{
		println!("string of {} bytes",self.total_memory());
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<A:Quantifiable,B:Quantifiable> Quantifiable for (A,B)
{
	fn total_memory(&self) -> usize
	{
		self.0.total_memory() + self.1.total_memory()
	}
	fn print_memory_breakdown(&self)
	{
		println!("pair: {} bytes",self.total_memory());
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}
